//! Table descriptor for a time-partitioned data source
//!
//! A [`TimeSeriesTable`] describes one remote data source to the planner:
//! its row type (resolved lazily against the planner's type factory), which
//! columns are metrics, which column carries event time, and the time
//! ranges the source is known to cover. Descriptors are immutable once built
//! and are shared between planning sessions behind an `Arc`.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Weak};

use log::debug;

use super::errors::{CatalogError, Result};
use super::interval::{Interval, DEFAULT_INTERVAL};
use super::metadata::{MetadataSource, TableMetadata};
use super::row_type::{map_row_type, FieldMap, RowType, RowTypeProducer, TypeFactory};
use super::schema::TimeSeriesSchema;
use crate::query_planner::{
    Convention, PlanningContext, RelNode, TableHandle, TableScan, TimeSeriesQuery,
};

/// Timestamp column assumed when a table does not name one
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "__time";

pub struct TimeSeriesTable {
    /// Owning schema. Non-owning: the schema holds the tables, not the reverse.
    schema: Weak<TimeSeriesSchema>,
    data_source: String,
    row_type: RowTypeProducer,
    metric_field_names: BTreeSet<String>,
    timestamp_field_name: String,
    intervals: Vec<Interval>,
}

impl TimeSeriesTable {
    /// Creates a time-series table.
    ///
    /// # Arguments
    /// * `schema` - Schema that contains this table
    /// * `data_source` - Data source name, also the table name
    /// * `row_type` - Field names and types
    /// * `metric_field_names` - Names of fields that are metrics
    /// * `timestamp_field_name` - Column that holds event time, or `None` for `__time`
    /// * `intervals` - Time ranges the table covers, or `None` for the default interval
    ///
    /// # Panics
    /// If any interval is not expressed in the UTC calendar. Intervals from
    /// untrusted text must go through [`Interval::parse`] first.
    pub fn create(
        schema: &Weak<TimeSeriesSchema>,
        data_source: &str,
        row_type: RowTypeProducer,
        metric_field_names: &BTreeSet<String>,
        timestamp_field_name: Option<&str>,
        intervals: Option<&[Interval]>,
    ) -> Result<Arc<Self>> {
        if schema.upgrade().is_none() {
            return Err(CatalogError::invalid_argument(format!(
                "table `{}` has no owning schema",
                data_source
            )));
        }
        if data_source.is_empty() {
            return Err(CatalogError::invalid_argument(
                "data source name must not be empty",
            ));
        }

        let intervals = match intervals {
            Some(intervals) => intervals.to_vec(),
            None => vec![DEFAULT_INTERVAL.clone()],
        };
        for interval in &intervals {
            assert!(
                interval.is_canonical_utc(),
                "interval {} of table `{}` is not in the UTC calendar",
                interval,
                data_source
            );
        }

        Ok(Arc::new(TimeSeriesTable {
            schema: schema.clone(),
            data_source: data_source.to_string(),
            row_type,
            metric_field_names: metric_field_names.clone(),
            timestamp_field_name: timestamp_field_name
                .unwrap_or(DEFAULT_TIMESTAMP_COLUMN)
                .to_string(),
            intervals,
        }))
    }

    /// Creates a table, first letting `source` complete the column map,
    /// metric set and intervals.
    ///
    /// `field_map` and `metric_names` may be partially populated already; on
    /// return they hold whatever the source added, even if it failed part way.
    /// Source errors are returned unchanged and no table is built.
    pub async fn create_with_discovery(
        schema: &Weak<TimeSeriesSchema>,
        data_source: &str,
        intervals: Option<&[Interval]>,
        field_map: &mut FieldMap,
        metric_names: &mut BTreeSet<String>,
        timestamp_column: Option<&str>,
        source: Option<&dyn MetadataSource>,
    ) -> Result<Arc<Self>> {
        let mut intervals = intervals.map(<[Interval]>::to_vec);

        if let Some(source) = source {
            debug!("Fetching metadata for data source `{}`", data_source);
            let mut metadata = TableMetadata::new(
                std::mem::take(field_map),
                std::mem::take(metric_names),
                intervals.take(),
            );
            let fetched = source
                .metadata(
                    data_source,
                    timestamp_column.unwrap_or(DEFAULT_TIMESTAMP_COLUMN),
                    &mut metadata,
                )
                .await;

            *field_map = metadata.fields;
            *metric_names = metadata.metric_names;
            intervals = metadata.intervals;
            fetched?;

            debug!(
                "Data source `{}` has {} fields, metrics {:?}",
                data_source,
                field_map.len(),
                metric_names
            );
        }

        Self::create(
            schema,
            data_source,
            map_row_type(field_map.clone()),
            metric_names,
            timestamp_column,
            intervals.as_deref(),
        )
    }

    /// Resolves the row type against `type_factory`.
    ///
    /// Fails with [`CatalogError::SchemaInconsistency`] when the timestamp
    /// column or a metric column is missing from the resolved fields.
    pub fn row_type(&self, type_factory: &dyn TypeFactory) -> Result<RowType> {
        let row_type = (self.row_type)(type_factory)?;
        let field_names = row_type.field_names();

        if !field_names.contains(&self.timestamp_field_name.as_str()) {
            return Err(CatalogError::schema_inconsistency(
                &self.data_source,
                format!(
                    "timestamp field '{}' is not present in the row type",
                    self.timestamp_field_name
                ),
            ));
        }
        if let Some(missing) = self
            .metric_field_names
            .iter()
            .find(|metric| !field_names.contains(&metric.as_str()))
        {
            return Err(CatalogError::schema_inconsistency(
                &self.data_source,
                format!("metric field '{}' is not present in the row type", missing),
            ));
        }

        Ok(row_type)
    }

    /// Translates a scan of this table into a [`TimeSeriesQuery`] whose only
    /// input is a generic scan of `table`.
    pub fn to_rel(self: &Arc<Self>, context: &PlanningContext, table: &TableHandle) -> RelNode {
        let cluster = context.cluster();
        let scan = TableScan::create(cluster, table);
        TimeSeriesQuery::create(
            cluster,
            cluster.trait_set_of(Convention::Bindable),
            table.clone(),
            Arc::clone(self),
            vec![Arc::new(RelNode::TableScan(scan))],
        )
        .into()
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    /// Owning schema, if it is still alive
    pub fn schema(&self) -> Option<Arc<TimeSeriesSchema>> {
        self.schema.upgrade()
    }

    pub fn metric_field_names(&self) -> &BTreeSet<String> {
        &self.metric_field_names
    }

    pub fn is_metric(&self, field: &str) -> bool {
        self.metric_field_names.contains(field)
    }

    pub fn timestamp_field_name(&self) -> &str {
        &self.timestamp_field_name
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }
}

impl fmt::Debug for TimeSeriesTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeSeriesTable")
            .field("data_source", &self.data_source)
            .field("metric_field_names", &self.metric_field_names)
            .field("timestamp_field_name", &self.timestamp_field_name)
            .field("intervals", &self.intervals)
            .finish_non_exhaustive()
    }
}
