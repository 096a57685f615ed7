//! Loading a schema from a YAML catalog file

use std::io::Write;
use std::sync::Arc;

use clickseries::table_catalog::{
    CatalogConfig, CatalogError, MetadataSource, ScalarType, SqlTypeFactory, TimeSeriesSchema,
};

use super::common::{name_set, MockSource};

const CATALOG: &str = r#"
name: analytics
tables:
  - data_source: page_views
    metrics: [clicks]
    columns:
      __time: timestamp
      city: varchar
      clicks: bigint
  - data_source: sales
    timestamp_column: ts
    intervals: ["2024-01-01T00:00:00Z/2025-01-01T00:00:00Z"]
    discover: true
"#;

fn catalog_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn sales_source() -> MockSource {
    let mut source = MockSource::new();
    source
        .expect_metadata()
        .withf(|data_source, timestamp_column, _| {
            data_source.to_string() == "sales" && timestamp_column.to_string() == "ts"
        })
        .returning(|_, _, metadata| {
            metadata
                .fields
                .insert("ts".to_string(), ScalarType::Timestamp);
            metadata
                .fields
                .insert("amount".to_string(), ScalarType::Decimal);
            metadata.metric_names.insert("amount".to_string());
            Ok(())
        });
    source
}

#[tokio::test]
async fn test_schema_from_catalog_file() {
    let file = catalog_file(CATALOG);
    let catalog = CatalogConfig::from_yaml_file(file.path()).unwrap();
    let source: Arc<dyn MetadataSource> = Arc::new(sales_source());

    let schema = TimeSeriesSchema::from_config(&catalog, Some(source))
        .await
        .unwrap();

    assert_eq!(schema.name(), "analytics");
    assert_eq!(schema.table_names(), vec!["page_views", "sales"]);

    let sales = schema.table("sales").unwrap();
    assert_eq!(sales.timestamp_field_name(), "ts");
    assert_eq!(sales.metric_field_names(), &name_set(&["amount"]));
    // intervals from the catalog are kept, not replaced by discovery
    assert_eq!(
        sales.intervals()[0].to_string(),
        "2024-01-01T00:00:00Z/2025-01-01T00:00:00Z"
    );
}

#[tokio::test]
async fn test_catalog_tables_resolve_handles() {
    let catalog = CatalogConfig::from_yaml_str(CATALOG).unwrap();
    let source: Arc<dyn MetadataSource> = Arc::new(sales_source());
    let schema = TimeSeriesSchema::from_config(&catalog, Some(source))
        .await
        .unwrap();

    let factory = SqlTypeFactory::new();
    let handle = schema.table_handle("page_views", &factory).unwrap();
    assert_eq!(handle.qualified_name(), ["analytics", "page_views"]);
    assert_eq!(
        handle.row_type().field_names(),
        vec!["__time", "city", "clicks"]
    );

    let sales = schema.table_handle("sales", &factory).unwrap();
    assert_eq!(
        sales.row_type().field("amount").map(|f| f.scalar_type),
        Some(ScalarType::Decimal)
    );
}

#[test]
fn test_static_catalog_needs_no_source() {
    let yaml = r#"
name: static
tables:
  - data_source: page_views
    metrics: [clicks]
    columns:
      __time: timestamp
      clicks: bigint
"#;
    let catalog = CatalogConfig::from_yaml_str(yaml).unwrap();
    let schema = tokio_test::block_on(TimeSeriesSchema::from_config(&catalog, None)).unwrap();

    let table = schema.table("page_views").unwrap();
    assert!(table.is_metric("clicks"));
    assert!(Arc::ptr_eq(&table.schema().unwrap(), &schema));
}

#[tokio::test]
async fn test_invalid_catalog_is_rejected_before_loading() {
    let yaml = r#"
name: broken
tables:
  - data_source: page_views
    metrics: [clicks]
    columns:
      __time: timestamp
"#;
    let catalog = CatalogConfig::from_yaml_str(yaml).unwrap();
    let result = TimeSeriesSchema::from_config(&catalog, None).await;
    assert!(matches!(result, Err(CatalogError::InvalidConfig { .. })));
}

#[test]
fn test_missing_catalog_file() {
    let result = CatalogConfig::from_yaml_file("/nonexistent/catalog.yaml");
    assert!(matches!(result, Err(CatalogError::ConfigReadError { .. })));
}
