//! Shared helpers for the unit test suite

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use clickseries::table_catalog::{
    map_row_type, FieldMap, MetadataError, MetadataSource, ScalarType, TableMetadata,
    TimeSeriesSchema, TimeSeriesTable,
};
use mockall::mock;

mock! {
    pub Source {}

    #[async_trait]
    impl MetadataSource for Source {
        async fn data_source_names(&self) -> Result<Vec<String>, MetadataError>;
        async fn metadata(
            &self,
            data_source: &str,
            timestamp_column: &str,
            metadata: &mut TableMetadata,
        ) -> Result<(), MetadataError>;
    }
}

pub fn field_map(entries: &[(&str, ScalarType)]) -> FieldMap {
    entries
        .iter()
        .map(|(name, ty)| (name.to_string(), *ty))
        .collect()
}

pub fn name_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// The page-view table used across tests: `__time`, `city`, `clicks`
pub fn page_views(schema: &Arc<TimeSeriesSchema>) -> Arc<TimeSeriesTable> {
    TimeSeriesTable::create(
        &Arc::downgrade(schema),
        "page_views",
        map_row_type(field_map(&[
            ("__time", ScalarType::Timestamp),
            ("city", ScalarType::Varchar),
            ("clicks", ScalarType::Integer),
        ])),
        &name_set(&["clicks"]),
        None,
        None,
    )
    .expect("page_views table should build")
}
