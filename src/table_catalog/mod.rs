pub mod clickhouse_metadata;
pub mod config;
pub mod errors;
pub mod interval;
pub mod metadata;
pub mod row_type;
pub mod schema;
pub mod time_series_table;

// Re-export commonly used types
pub use clickhouse_metadata::ClickHouseMetadataSource;
pub use config::{CatalogConfig, TableDefinition};
pub use errors::CatalogError;
pub use interval::{Interval, IntervalError, DEFAULT_INTERVAL};
pub use metadata::{MetadataError, MetadataSource, TableMetadata};
pub use row_type::{
    map_row_type, FieldMap, RelField, RowType, RowTypeProducer, ScalarType, SqlTypeFactory,
    TypeFactory, TypeFactoryError,
};
pub use schema::{TableSeed, TimeSeriesSchema};
pub use time_series_table::{TimeSeriesTable, DEFAULT_TIMESTAMP_COLUMN};
