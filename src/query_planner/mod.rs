//! Plan construction for time-series tables
//!
//! Only the structural step of turning a table reference into a plan node
//! lives here. Pushdown rules that rewrite [`TimeSeriesQuery`] operate on the
//! nodes defined in this module but are not part of this crate.

mod cluster;
mod rel_node;
mod table_handle;

pub use cluster::{Cluster, Convention, PlanningContext, TraitSet};
pub use rel_node::{RelNode, TableScan, TimeSeriesQuery};
pub use table_handle::TableHandle;
