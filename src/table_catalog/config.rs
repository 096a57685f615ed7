use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::CatalogError;
use super::interval::Interval;
use super::metadata::TableMetadata;
use super::row_type::ScalarType;
use super::schema::TableSeed;
use super::time_series_table::DEFAULT_TIMESTAMP_COLUMN;

/// Time-series catalogs are defined in YAML with the following structure:
///
/// ```yaml
/// name: analytics                 # Schema name
/// tables:
///   - data_source: page_views     # Remote data source, also the table name
///     timestamp_column: __time    # Optional, defaults to __time
///     metrics: [clicks]           # Additive measure columns
///     columns:                    # Known columns (may be partial when discover = true)
///       __time: timestamp
///       city: varchar
///       clicks: bigint
///     intervals:                  # Optional; UTC only
///       - "2024-01-01T00:00:00Z/2025-01-01T00:00:00Z"
///     discover: false             # Complete the columns from ClickHouse
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<TableDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinition {
    pub data_source: String,
    #[serde(default)]
    pub timestamp_column: Option<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub columns: BTreeMap<String, ScalarType>,
    /// Parsed with [`Interval::parse`]; offsets other than UTC are rejected
    #[serde(default)]
    pub intervals: Vec<Interval>,
    #[serde(default)]
    pub discover: bool,
}

impl TableDefinition {
    /// Seed for building this table; empty `intervals` means "use the default"
    pub fn seed(&self) -> TableSeed {
        let intervals = if self.intervals.is_empty() {
            None
        } else {
            Some(self.intervals.clone())
        };
        TableSeed {
            metadata: TableMetadata::new(
                self.columns.clone(),
                self.metrics.iter().cloned().collect(),
                intervals,
            ),
            timestamp_column: self.timestamp_column.clone(),
            discover: self.discover,
        }
    }
}

impl CatalogConfig {
    /// Load a catalog from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|e| CatalogError::ConfigReadError {
            error: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    /// Parse a catalog from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        serde_yaml::from_str(yaml).map_err(|e| CatalogError::ConfigParseError {
            error: e.to_string(),
        })
    }

    /// Structural validation.
    ///
    /// Tables that are not discovered must already declare their timestamp
    /// and metric columns; discovered tables are checked when their row type
    /// is resolved instead.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::InvalidConfig {
                message: "Catalog name must not be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if table.data_source.trim().is_empty() {
                return Err(CatalogError::InvalidConfig {
                    message: "Table data_source must not be empty".to_string(),
                });
            }
            if !seen.insert(&table.data_source) {
                return Err(CatalogError::InvalidConfig {
                    message: format!("Duplicate table: {}", table.data_source),
                });
            }
            if table.discover {
                continue;
            }

            let timestamp = table
                .timestamp_column
                .as_deref()
                .unwrap_or(DEFAULT_TIMESTAMP_COLUMN);
            if !table.columns.contains_key(timestamp) {
                return Err(CatalogError::config_error_with_context(
                    &table.data_source,
                    format!("timestamp column '{}' is not declared in columns", timestamp),
                ));
            }
            if let Some(metric) = table
                .metrics
                .iter()
                .find(|m| !table.columns.contains_key(m.as_str()))
            {
                return Err(CatalogError::config_error_with_context(
                    &table.data_source,
                    format!("metric '{}' is not declared in columns", metric),
                ));
            }
        }

        Ok(())
    }
}
