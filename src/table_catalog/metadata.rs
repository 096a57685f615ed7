//! Live metadata discovery seam
//!
//! A [`MetadataSource`] completes a partially-populated [`TableMetadata`]
//! before a table descriptor is frozen. Callers may pre-seed known columns
//! (for example from a catalog file) and only pay for a live lookup when a
//! source is supplied.

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;

use super::interval::Interval;
use super::row_type::FieldMap;

/// Errors raised by a metadata source. These surface to callers unchanged.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Unknown data source `{data_source}`")]
    UnknownDataSource { data_source: String },
    #[error("Failed to query metadata for `{data_source}`: {source}")]
    Query {
        data_source: String,
        source: clickhouse::error::Error,
    },
    #[error("Invalid metadata for `{data_source}`: {message}")]
    Invalid {
        data_source: String,
        message: String,
    },
}

/// Mutable metadata seed for one data source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableMetadata {
    /// Dimensions plus metrics
    pub fields: FieldMap,
    pub metric_names: BTreeSet<String>,
    /// `None` until either the caller or the source supplies bounds
    pub intervals: Option<Vec<Interval>>,
}

impl TableMetadata {
    pub fn new(
        fields: FieldMap,
        metric_names: BTreeSet<String>,
        intervals: Option<Vec<Interval>>,
    ) -> Self {
        TableMetadata {
            fields,
            metric_names,
            intervals,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Names of all data sources the store exposes
    async fn data_source_names(&self) -> Result<Vec<String>, MetadataError>;

    /// Extend `metadata` with the columns, metrics and (if absent) intervals
    /// of `data_source`. Entries already present in the seed are kept.
    async fn metadata(
        &self,
        data_source: &str,
        timestamp_column: &str,
        metadata: &mut TableMetadata,
    ) -> Result<(), MetadataError>;
}
