//! ClickHouse-backed metadata discovery
//!
//! Treats every table of one ClickHouse database as a time-series data
//! source. Column names and types come from `system.columns`, metrics are
//! inferred from aggregate column types and the table engine, and the
//! queryable interval is the observed range of the timestamp column.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use clickhouse::Client;
use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;

use super::interval::{Interval, IntervalError};
use super::metadata::{MetadataError, MetadataSource, TableMetadata};
use super::row_type::ScalarType;

/// Nullable(T) / LowCardinality(T)
static WRAPPER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Nullable|LowCardinality)\((.*)\)$").unwrap());

/// SimpleAggregateFunction(fn, T)
/// Captures: (1) the stored value type
static SIMPLE_AGGREGATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^SimpleAggregateFunction\(\s*[^,]+,\s*(.*)\)$").unwrap());

/// Engine family of a ClickHouse table, as far as metric inference cares
#[derive(Debug, Clone, PartialEq)]
pub enum TableEngine {
    MergeTree,
    /// SummingMergeTree; `sum_columns` empty means "all numeric non-key columns"
    SummingMergeTree { sum_columns: Vec<String> },
    AggregatingMergeTree,
    Other(String),
}

impl TableEngine {
    pub fn parse(engine: &str, engine_full: &str) -> Self {
        match engine {
            "MergeTree" | "ReplicatedMergeTree" => TableEngine::MergeTree,
            "SummingMergeTree" | "ReplicatedSummingMergeTree" => TableEngine::SummingMergeTree {
                sum_columns: extract_sum_columns(engine, engine_full),
            },
            "AggregatingMergeTree" | "ReplicatedAggregatingMergeTree" => {
                TableEngine::AggregatingMergeTree
            }
            other => TableEngine::Other(other.to_string()),
        }
    }

    /// True if rows are pre-aggregated, making numeric value columns additive
    pub fn is_aggregating(&self) -> bool {
        matches!(
            self,
            TableEngine::SummingMergeTree { .. } | TableEngine::AggregatingMergeTree
        )
    }
}

/// Extracts the explicit column list of a SummingMergeTree engine
///
/// Examples:
/// - "SummingMergeTree((amount, quantity)) ORDER BY id" -> ["amount", "quantity"]
/// - "SummingMergeTree(amount) ORDER BY id" -> ["amount"]
/// - "SummingMergeTree ORDER BY (id, ts)" -> []
/// - "ReplicatedSummingMergeTree('/clickhouse/tables/{shard}/t', '{replica}', (amount))" -> ["amount"]
fn extract_sum_columns(engine: &str, engine_full: &str) -> Vec<String> {
    let Some(rest) = engine_full.trim().strip_prefix(engine) else {
        return Vec::new();
    };
    let Some(args) = rest.strip_prefix('(') else {
        return Vec::new();
    };

    let Some(args) = split_engine_args(args) else {
        return Vec::new();
    };

    // Replicated engines take the keeper path and replica name first
    args.into_iter()
        .skip_while(|arg| engine.starts_with("Replicated") && is_string_literal(arg))
        .flat_map(|arg| arg.split(','))
        .map(|part| part.trim().trim_matches(|c| c == '(' || c == ')' || c == '`'))
        .filter(|part| !part.is_empty() && !is_string_literal(part))
        .map(str::to_string)
        .collect()
}

fn is_string_literal(arg: &str) -> bool {
    arg.starts_with('\'')
}

/// Splits the argument list following an engine name at top-level commas.
///
/// `args` starts right after the opening parenthesis. Returns `None` when the
/// closing parenthesis is missing.
fn split_engine_args(args: &str) -> Option<Vec<&str>> {
    let mut depth = 1;
    let mut in_string = false;
    let mut start = 0;
    let mut parts = Vec::new();

    let mut chars = args.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if in_string => {
                chars.next();
            }
            '\'' => in_string = !in_string,
            _ if in_string => {}
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    parts.push(args[start..i].trim());
                    return Some(parts.into_iter().filter(|p| !p.is_empty()).collect());
                }
            }
            ',' if depth == 1 => {
                parts.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    None
}

/// Strip Nullable/LowCardinality wrappers
fn unwrap_type(mut data_type: &str) -> &str {
    while let Some(inner) = WRAPPER_PATTERN
        .captures(data_type)
        .and_then(|caps| caps.get(1))
    {
        data_type = inner.as_str();
    }
    data_type
}

/// Map a ClickHouse column type to the relational scalar vocabulary
pub fn scalar_type_from_clickhouse(data_type: &str) -> ScalarType {
    let data_type = unwrap_type(data_type.trim());
    if let Some(inner) = SIMPLE_AGGREGATE_PATTERN
        .captures(data_type)
        .and_then(|caps| caps.get(1))
    {
        return scalar_type_from_clickhouse(inner.as_str());
    }

    let base = data_type.split('(').next().unwrap_or(data_type);
    match base {
        "Bool" => ScalarType::Boolean,
        "Int8" => ScalarType::TinyInt,
        "UInt8" | "Int16" => ScalarType::SmallInt,
        "UInt16" | "Int32" => ScalarType::Integer,
        "UInt32" | "Int64" => ScalarType::BigInt,
        "UInt64" | "Int128" | "UInt128" | "Int256" | "UInt256" => ScalarType::Decimal,
        "Float32" => ScalarType::Float,
        "Float64" => ScalarType::Double,
        "Decimal" | "Decimal32" | "Decimal64" | "Decimal128" | "Decimal256" => {
            ScalarType::Decimal
        }
        "String" | "UUID" | "Enum8" | "Enum16" | "IPv4" | "IPv6" => ScalarType::Varchar,
        "FixedString" => ScalarType::Char,
        "Date" | "Date32" => ScalarType::Date,
        "DateTime" | "DateTime64" => ScalarType::Timestamp,
        _ => ScalarType::Other,
    }
}

fn is_aggregate_type(data_type: &str) -> bool {
    let data_type = unwrap_type(data_type.trim());
    data_type.starts_with("AggregateFunction(") || data_type.starts_with("SimpleAggregateFunction(")
}

/// A column as reported by `system.columns`
#[derive(Debug, Clone, PartialEq, clickhouse::Row, Deserialize)]
pub struct ColumnRow {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub is_in_sorting_key: u8,
}

/// Decide which columns are metrics.
///
/// Aggregate-state columns are always metrics. For summing/aggregating
/// engines, the explicit sum list wins; without one, every numeric column
/// outside the sorting key (and other than the timestamp) is a metric.
pub fn classify_metrics(
    engine: &TableEngine,
    columns: &[ColumnRow],
    timestamp_column: &str,
) -> BTreeSet<String> {
    let mut metrics: BTreeSet<String> = columns
        .iter()
        .filter(|c| is_aggregate_type(&c.data_type))
        .map(|c| c.name.clone())
        .collect();

    match engine {
        TableEngine::SummingMergeTree { sum_columns } if !sum_columns.is_empty() => {
            metrics.extend(
                sum_columns
                    .iter()
                    .filter(|name| columns.iter().any(|c| &c.name == *name))
                    .cloned(),
            );
        }
        engine if engine.is_aggregating() => {
            metrics.extend(
                columns
                    .iter()
                    .filter(|c| {
                        c.is_in_sorting_key == 0
                            && c.name != timestamp_column
                            && scalar_type_from_clickhouse(&c.data_type).is_numeric()
                    })
                    .map(|c| c.name.clone()),
            );
        }
        _ => {}
    }

    metrics
}

/// Merge the columns reported by the store into `metadata`.
///
/// Columns the caller already seeded keep their type. Returns true when the
/// intervals are still unset and the timestamp column exists, i.e. when the
/// observed time range should be queried.
pub fn merge_columns(
    metadata: &mut TableMetadata,
    engine: &TableEngine,
    columns: &[ColumnRow],
    timestamp_column: &str,
) -> bool {
    for column in columns {
        metadata
            .fields
            .entry(column.name.clone())
            .or_insert_with(|| scalar_type_from_clickhouse(&column.data_type));
    }
    metadata
        .metric_names
        .extend(classify_metrics(engine, columns, timestamp_column));

    metadata.intervals.is_none() && columns.iter().any(|c| c.name == timestamp_column)
}

/// Observed `[min, max]` in epoch millis as the half-open `[min, max + 1ms)`;
/// `None` when the table has no rows
pub fn observed_interval(
    row_count: u64,
    min_ms: i64,
    max_ms: i64,
) -> Result<Option<Interval>, IntervalError> {
    if row_count == 0 {
        return Ok(None);
    }
    Interval::from_millis(min_ms, max_ms.saturating_add(1)).map(Some)
}

fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Metadata source reading one ClickHouse database
#[derive(Clone)]
pub struct ClickHouseMetadataSource {
    client: Client,
    database: String,
}

impl ClickHouseMetadataSource {
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        ClickHouseMetadataSource {
            client,
            database: database.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn query_error(data_source: &str, source: clickhouse::error::Error) -> MetadataError {
        MetadataError::Query {
            data_source: data_source.to_string(),
            source,
        }
    }

    async fn table_engine(&self, data_source: &str) -> Result<TableEngine, MetadataError> {
        #[derive(Debug, clickhouse::Row, Deserialize)]
        struct EngineRow {
            engine: String,
            engine_full: String,
        }

        let rows: Vec<EngineRow> = self
            .client
            .query("SELECT engine, engine_full FROM system.tables WHERE database = ? AND name = ?")
            .bind(&self.database)
            .bind(data_source)
            .fetch_all()
            .await
            .map_err(|e| Self::query_error(data_source, e))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| MetadataError::UnknownDataSource {
                data_source: data_source.to_string(),
            })?;

        debug!(
            "Table {}.{} uses engine: {} (full: {})",
            self.database(),
            data_source,
            row.engine,
            row.engine_full
        );
        Ok(TableEngine::parse(&row.engine, &row.engine_full))
    }

    async fn columns(&self, data_source: &str) -> Result<Vec<ColumnRow>, MetadataError> {
        self.client
            .query(
                "SELECT name, type, is_in_sorting_key FROM system.columns \
                 WHERE database = ? AND table = ? ORDER BY position",
            )
            .bind(&self.database)
            .bind(data_source)
            .fetch_all()
            .await
            .map_err(|e| Self::query_error(data_source, e))
    }

    /// Observed `[min, max]` of the timestamp column as a half-open interval;
    /// `None` for an empty table
    async fn time_bounds(
        &self,
        data_source: &str,
        timestamp_column: &str,
    ) -> Result<Option<Interval>, MetadataError> {
        #[derive(Debug, clickhouse::Row, Deserialize)]
        struct BoundsRow {
            row_count: u64,
            min_ms: i64,
            max_ms: i64,
        }

        let column = quote_identifier(timestamp_column);
        let query = format!(
            "SELECT count() AS row_count, \
             toUnixTimestamp64Milli(toDateTime64(min({column}), 3)) AS min_ms, \
             toUnixTimestamp64Milli(toDateTime64(max({column}), 3)) AS max_ms \
             FROM {}.{}",
            quote_identifier(&self.database),
            quote_identifier(data_source)
        );

        let bounds: BoundsRow = self
            .client
            .query(&query)
            .fetch_one()
            .await
            .map_err(|e| Self::query_error(data_source, e))?;

        observed_interval(bounds.row_count, bounds.min_ms, bounds.max_ms)
            .map_err(|e| MetadataError::Invalid {
                data_source: data_source.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl MetadataSource for ClickHouseMetadataSource {
    async fn data_source_names(&self) -> Result<Vec<String>, MetadataError> {
        #[derive(Debug, clickhouse::Row, Deserialize)]
        struct TableName {
            name: String,
        }

        let rows: Vec<TableName> = self
            .client
            .query(
                "SELECT name FROM system.tables WHERE database = ? \
                 AND engine NOT IN ('SystemTable', 'MaterializedView') ORDER BY name",
            )
            .bind(&self.database)
            .fetch_all()
            .await
            .map_err(|e| Self::query_error(&self.database, e))?;

        Ok(rows.into_iter().map(|t| t.name).collect())
    }

    async fn metadata(
        &self,
        data_source: &str,
        timestamp_column: &str,
        metadata: &mut TableMetadata,
    ) -> Result<(), MetadataError> {
        let engine = self.table_engine(data_source).await?;
        let columns = self.columns(data_source).await?;

        if merge_columns(metadata, &engine, &columns, timestamp_column) {
            if let Some(interval) = self.time_bounds(data_source, timestamp_column).await? {
                metadata.intervals = Some(vec![interval]);
            }
        } else if metadata.intervals.is_none() {
            warn!(
                "Timestamp column `{}` not found in {}.{}",
                timestamp_column,
                self.database(),
                data_source
            );
        }

        info!(
            "Discovered {}.{}: {} columns, metrics {:?}",
            self.database(),
            data_source,
            columns.len(),
            metadata.metric_names
        );
        Ok(())
    }
}
