//! # Table Catalog Error Types
//!
//! Error handling for time-series table descriptors, catalog configuration
//! and metadata discovery.
//!
//! ## Error Categories
//!
//! - **Argument Errors**: missing identity fields at construction time
//! - **Schema Errors**: a resolved row type that disagrees with the declared
//!   timestamp or metric columns
//! - **Collaborator Errors**: type factory and metadata source failures,
//!   wrapped without modification
//! - **Configuration Errors**: file I/O and parsing issues while loading a catalog
//!
//! ## Usage Patterns
//!
//! ```ignore
//! CatalogError::schema_inconsistency(
//!     "page_views",
//!     "metric field 'clicks' is not present in the row type",
//! )
//! ```

use thiserror::Error;

use super::interval::IntervalError;
use super::metadata::MetadataError;
use super::row_type::TypeFactoryError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("Schema inconsistency in table `{table}`: {message}")]
    SchemaInconsistency { table: String, message: String },
    #[error("Invalid interval: {0}")]
    Interval(#[from] IntervalError),
    #[error("Type factory rejected row type: {0}")]
    TypeFactory(#[from] TypeFactoryError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("No table named `{table}` in schema `{schema}`")]
    TableNotFound { schema: String, table: String },
    #[error("Failed to read catalog file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse catalog: {error}")]
    ConfigParseError { error: String },
    #[error("Invalid catalog configuration: {message}")]
    InvalidConfig { message: String },
}

impl CatalogError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CatalogError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn schema_inconsistency(table: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogError::SchemaInconsistency {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidConfig error naming the offending catalog entry
    ///
    /// # Example
    /// ```ignore
    /// CatalogError::config_error_with_context(
    ///     "page_views",
    ///     "metric 'clicks' is not declared in columns",
    /// )
    /// ```
    pub fn config_error_with_context(
        data_source: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        CatalogError::InvalidConfig {
            message: format!(
                "table '{}': {}",
                data_source.into(),
                context.into()
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
