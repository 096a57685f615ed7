//! ClickSeries - time-series tables over ClickHouse for relational planners
//!
//! This crate exposes ClickHouse tables as time-series data sources inside a
//! host query planner through:
//! - Table descriptors with a lazily resolved, all-nullable row type
//! - Metric, timestamp and interval metadata, optionally discovered live
//! - Translation of a table scan into a pushdown-ready query node

pub mod config;
pub mod query_planner;
pub mod table_catalog;
