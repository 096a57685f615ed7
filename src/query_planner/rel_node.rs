//! Plan nodes produced when a time-series table is scanned
//!
//! [`TableScan`] is the generic full scan. [`TimeSeriesQuery`] wraps it and
//! keeps the table descriptor, so pushdown rules can decide from its metric,
//! timestamp and interval metadata what the remote store can evaluate.

use std::fmt;
use std::sync::Arc;

use super::cluster::{Cluster, Convention, TraitSet};
use super::table_handle::TableHandle;
use crate::table_catalog::{RowType, TimeSeriesTable};

#[derive(Debug, Clone)]
pub enum RelNode {
    TableScan(TableScan),
    TimeSeriesQuery(TimeSeriesQuery),
}

/// Full scan of a table, in the logical convention
#[derive(Debug, Clone)]
pub struct TableScan {
    cluster: Arc<Cluster>,
    trait_set: TraitSet,
    table: TableHandle,
}

impl TableScan {
    pub fn create(cluster: &Arc<Cluster>, table: &TableHandle) -> Self {
        TableScan {
            cluster: Arc::clone(cluster),
            trait_set: cluster.trait_set_of(Convention::Logical),
            table: table.clone(),
        }
    }

    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }

    pub fn trait_set(&self) -> TraitSet {
        self.trait_set
    }

    pub fn table(&self) -> &TableHandle {
        &self.table
    }
}

/// Query against a time-series data source, built up by pushdown rules
/// starting from a single scan
#[derive(Debug, Clone)]
pub struct TimeSeriesQuery {
    cluster: Arc<Cluster>,
    trait_set: TraitSet,
    table: TableHandle,
    time_series_table: Arc<TimeSeriesTable>,
    rels: Vec<Arc<RelNode>>,
}

impl TimeSeriesQuery {
    pub fn create(
        cluster: &Arc<Cluster>,
        trait_set: TraitSet,
        table: TableHandle,
        time_series_table: Arc<TimeSeriesTable>,
        rels: Vec<Arc<RelNode>>,
    ) -> Self {
        TimeSeriesQuery {
            cluster: Arc::clone(cluster),
            trait_set,
            table,
            time_series_table,
            rels,
        }
    }

    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }

    pub fn trait_set(&self) -> TraitSet {
        self.trait_set
    }

    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    pub fn time_series_table(&self) -> &Arc<TimeSeriesTable> {
        &self.time_series_table
    }

    pub fn rels(&self) -> &[Arc<RelNode>] {
        &self.rels
    }

    /// The scan at the bottom of the query, if the first rel is one
    pub fn scan(&self) -> Option<&TableScan> {
        match self.rels.first().map(Arc::as_ref) {
            Some(RelNode::TableScan(scan)) => Some(scan),
            _ => None,
        }
    }

    /// One letter per rel, bottom up: `s` for a scan, `q` for a nested query
    pub fn signature(&self) -> String {
        self.rels
            .iter()
            .map(|rel| match rel.as_ref() {
                RelNode::TableScan(_) => 's',
                RelNode::TimeSeriesQuery(_) => 'q',
            })
            .collect()
    }
}

impl From<TimeSeriesQuery> for RelNode {
    fn from(query: TimeSeriesQuery) -> Self {
        RelNode::TimeSeriesQuery(query)
    }
}

impl From<TableScan> for RelNode {
    fn from(scan: TableScan) -> Self {
        RelNode::TableScan(scan)
    }
}

impl RelNode {
    pub fn inputs(&self) -> &[Arc<RelNode>] {
        match self {
            RelNode::TableScan(_) => &[],
            RelNode::TimeSeriesQuery(query) => query.rels(),
        }
    }

    pub fn trait_set(&self) -> TraitSet {
        match self {
            RelNode::TableScan(scan) => scan.trait_set(),
            RelNode::TimeSeriesQuery(query) => query.trait_set(),
        }
    }

    pub fn convention(&self) -> Convention {
        self.trait_set().convention()
    }

    pub fn row_type(&self) -> &RowType {
        match self {
            RelNode::TableScan(scan) => scan.table().row_type(),
            RelNode::TimeSeriesQuery(query) => query.table().row_type(),
        }
    }

    fn describe(&self) -> String {
        match self {
            RelNode::TableScan(scan) => {
                format!("TableScan(table=[{}])", scan.table().qualified_name().join(", "))
            }
            RelNode::TimeSeriesQuery(query) => {
                let table = query.time_series_table();
                let intervals: Vec<String> =
                    table.intervals().iter().map(|i| i.to_string()).collect();
                let metrics: Vec<&str> =
                    table.metric_field_names().iter().map(String::as_str).collect();
                format!(
                    "TimeSeriesQuery(table=[{}], intervals=[{}], timestamp=[{}], metrics=[{}], signature=[{}])",
                    query.table().qualified_name().join(", "),
                    intervals.join(", "),
                    table.timestamp_field_name(),
                    metrics.join(", "),
                    query.signature()
                )
            }
        }
    }

    fn fmt_with_tree(
        &self,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        is_last: bool,
        is_root: bool,
    ) -> fmt::Result {
        let (branch, next_prefix) = if is_last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };

        if is_root {
            writeln!(f, "{}", self.describe())?;
        } else {
            writeln!(f, "{}{}{}", prefix, branch, self.describe())?;
        }

        let child_prefix = if is_root {
            String::new()
        } else {
            format!("{}{}", prefix, next_prefix)
        };
        let inputs = self.inputs();
        for (i, input) in inputs.iter().enumerate() {
            input.fmt_with_tree(f, &child_prefix, i + 1 == inputs.len(), false)?;
        }
        Ok(())
    }
}

impl fmt::Display for RelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_tree(f, "", true, true)
    }
}
