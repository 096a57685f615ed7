//! Schema container for time-series tables
//!
//! A [`TimeSeriesSchema`] owns its tables. Each table keeps only a `Weak`
//! back-reference, so dropping the schema releases every descriptor that
//! is not still held by an in-flight plan.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use log::{debug, info, warn};

use super::config::CatalogConfig;
use super::errors::{CatalogError, Result};
use super::metadata::{MetadataSource, TableMetadata};
use super::row_type::TypeFactory;
use super::time_series_table::TimeSeriesTable;
use crate::query_planner::TableHandle;

/// Everything needed to (re)build a table: the caller-known metadata before
/// any live discovery ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSeed {
    pub metadata: TableMetadata,
    pub timestamp_column: Option<String>,
    /// Ask the schema's metadata source to complete `metadata`
    pub discover: bool,
}

struct SchemaEntry {
    seed: TableSeed,
    table: Arc<TimeSeriesTable>,
}

pub struct TimeSeriesSchema {
    name: String,
    source: Option<Arc<dyn MetadataSource>>,
    entries: RwLock<BTreeMap<String, SchemaEntry>>,
}

impl TimeSeriesSchema {
    pub fn new(name: impl Into<String>, source: Option<Arc<dyn MetadataSource>>) -> Arc<Self> {
        Arc::new(TimeSeriesSchema {
            name: name.into(),
            source,
            entries: RwLock::new(BTreeMap::new()),
        })
    }

    /// Build a schema from a catalog file definition, registering every table
    pub async fn from_config(
        config: &CatalogConfig,
        source: Option<Arc<dyn MetadataSource>>,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let schema = Self::new(config.name.clone(), source);
        for definition in &config.tables {
            schema
                .add_table(&definition.data_source, definition.seed())
                .await?;
        }
        info!(
            "Loaded schema `{}` with {} tables",
            schema.name,
            config.tables.len()
        );
        Ok(schema)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build and register a table, replacing any table of the same name
    pub async fn add_table(
        self: &Arc<Self>,
        data_source: &str,
        seed: TableSeed,
    ) -> Result<Arc<TimeSeriesTable>> {
        let table = self.build_table(data_source, &seed).await?;
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.contains_key(data_source) {
            debug!("Replacing table `{}` in schema `{}`", data_source, self.name);
        }
        entries.insert(
            data_source.to_string(),
            SchemaEntry {
                seed,
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }

    /// Register every data source the metadata source knows about and this
    /// schema does not have yet. Returns the names that were added.
    ///
    /// `timestamp_column` is assumed for each new table; `None` means `__time`.
    pub async fn discover(self: &Arc<Self>, timestamp_column: Option<&str>) -> Result<Vec<String>> {
        let Some(source) = &self.source else {
            warn!(
                "Schema `{}` has no metadata source; nothing to discover",
                self.name
            );
            return Ok(Vec::new());
        };

        let known: BTreeSet<String> = self.table_names().into_iter().collect();
        let mut added = Vec::new();
        for data_source in source.data_source_names().await? {
            if known.contains(&data_source) {
                continue;
            }
            let seed = TableSeed {
                timestamp_column: timestamp_column.map(str::to_string),
                discover: true,
                ..TableSeed::default()
            };
            self.add_table(&data_source, seed).await?;
            added.push(data_source);
        }

        info!(
            "Discovered {} new tables in schema `{}`",
            added.len(),
            self.name
        );
        Ok(added)
    }

    /// Rebuild one table from the seed it was added with. Plans holding the previous
    /// descriptor keep it alive until they finish.
    pub async fn refresh(self: &Arc<Self>, data_source: &str) -> Result<Arc<TimeSeriesTable>> {
        let seed = {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            entries
                .get(data_source)
                .map(|entry| entry.seed.clone())
                .ok_or_else(|| self.table_not_found(data_source))?
        };
        self.add_table(data_source, seed).await
    }

    pub fn table(&self, data_source: &str) -> Option<Arc<TimeSeriesTable>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(data_source)
            .map(|entry| Arc::clone(&entry.table))
    }

    pub fn table_names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Resolve a handle for `data_source` qualified by this schema's name
    pub fn table_handle(
        &self,
        data_source: &str,
        type_factory: &dyn TypeFactory,
    ) -> Result<TableHandle> {
        let table = self
            .table(data_source)
            .ok_or_else(|| self.table_not_found(data_source))?;
        let row_type = table.row_type(type_factory)?;
        Ok(TableHandle::new(
            vec![self.name.clone(), data_source.to_string()],
            row_type,
        ))
    }

    async fn build_table(
        self: &Arc<Self>,
        data_source: &str,
        seed: &TableSeed,
    ) -> Result<Arc<TimeSeriesTable>> {
        let mut metadata = seed.metadata.clone();
        let source = if seed.discover {
            self.source.as_deref()
        } else {
            None
        };
        if seed.discover && source.is_none() {
            warn!(
                "Table `{}` asks for discovery but schema `{}` has no metadata source",
                data_source, self.name
            );
        }

        TimeSeriesTable::create_with_discovery(
            &Arc::downgrade(self),
            data_source,
            metadata.intervals.as_deref(),
            &mut metadata.fields,
            &mut metadata.metric_names,
            seed.timestamp_column.as_deref(),
            source,
        )
        .await
    }

    fn table_not_found(&self, data_source: &str) -> CatalogError {
        CatalogError::TableNotFound {
            schema: self.name.clone(),
            table: data_source.to_string(),
        }
    }
}

impl std::fmt::Debug for TimeSeriesSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeSeriesSchema")
            .field("name", &self.name)
            .field("tables", &self.table_names())
            .field("has_source", &self.source.is_some())
            .finish()
    }
}
