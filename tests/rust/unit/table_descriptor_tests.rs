//! Construction, row-type resolution and discovery of table descriptors

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use clickseries::table_catalog::{
    map_row_type, CatalogError, FieldMap, MetadataError, MetadataSource, ScalarType,
    SqlTypeFactory, TimeSeriesSchema, TimeSeriesTable, DEFAULT_INTERVAL,
    DEFAULT_TIMESTAMP_COLUMN,
};

use super::common::{field_map, name_set, page_views, MockSource};

#[test]
fn test_page_views_defaults() {
    let schema = TimeSeriesSchema::new("analytics", None);
    let table = page_views(&schema);

    assert_eq!(table.timestamp_field_name(), "__time");
    assert_eq!(table.timestamp_field_name(), DEFAULT_TIMESTAMP_COLUMN);
    assert_eq!(table.intervals().len(), 1);
    assert_eq!(table.intervals()[0], *DEFAULT_INTERVAL);
    assert_eq!(
        table.intervals()[0].to_string(),
        "1900-01-01T00:00:00Z/3000-01-01T00:00:00Z"
    );
    assert!(table.row_type(&SqlTypeFactory::new()).is_ok());
}

#[test]
fn test_row_type_matches_field_map_and_is_nullable() {
    let fields = field_map(&[
        ("__time", ScalarType::Timestamp),
        ("region", ScalarType::Varchar),
        ("latency", ScalarType::Double),
        ("ok", ScalarType::Boolean),
    ]);
    let schema = TimeSeriesSchema::new("analytics", None);
    let table = TimeSeriesTable::create(
        &Arc::downgrade(&schema),
        "requests",
        map_row_type(fields.clone()),
        &name_set(&["latency"]),
        None,
        None,
    )
    .unwrap();

    let row_type = table.row_type(&SqlTypeFactory::new()).unwrap();
    let names: BTreeSet<&str> = row_type.field_names().into_iter().collect();
    let keys: BTreeSet<&str> = fields.keys().map(String::as_str).collect();
    assert_eq!(names, keys);
    assert!(row_type.fields().iter().all(|f| f.nullable));
}

#[test]
fn test_metric_round_trip() {
    let schema = TimeSeriesSchema::new("analytics", None);
    let metrics = name_set(&["count", "value_sum"]);

    let complete = TimeSeriesTable::create(
        &Arc::downgrade(&schema),
        "events",
        map_row_type(field_map(&[
            ("ts", ScalarType::Timestamp),
            ("dim1", ScalarType::Varchar),
            ("count", ScalarType::BigInt),
            ("value_sum", ScalarType::Double),
        ])),
        &metrics,
        Some("ts"),
        None,
    )
    .unwrap();
    assert!(complete.row_type(&SqlTypeFactory::new()).is_ok());

    let without_value_sum = TimeSeriesTable::create(
        &Arc::downgrade(&schema),
        "events",
        map_row_type(field_map(&[
            ("ts", ScalarType::Timestamp),
            ("dim1", ScalarType::Varchar),
            ("count", ScalarType::BigInt),
        ])),
        &metrics,
        Some("ts"),
        None,
    )
    .unwrap();
    assert!(matches!(
        without_value_sum.row_type(&SqlTypeFactory::new()),
        Err(CatalogError::SchemaInconsistency { .. })
    ));
}

#[test]
fn test_row_type_is_idempotent() {
    let schema = TimeSeriesSchema::new("analytics", None);
    let table = page_views(&schema);
    let factory = SqlTypeFactory::new();

    let first = table.row_type(&factory).unwrap();
    let second = table.row_type(&factory).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_descriptor_shared_across_threads() {
    let schema = TimeSeriesSchema::new("analytics", None);
    let table = page_views(&schema);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let table = Arc::clone(&table);
            thread::spawn(move || table.row_type(&SqlTypeFactory::new()).unwrap())
        })
        .collect();

    let expected = table.row_type(&SqlTypeFactory::new()).unwrap();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
#[should_panic(expected = "not in the UTC calendar")]
fn test_non_utc_interval_is_a_defect() {
    use chrono::{FixedOffset, TimeZone};
    use clickseries::table_catalog::Interval;

    let tz = FixedOffset::east_opt(9 * 3600).unwrap();
    let interval = Interval::new(
        tz.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        tz.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
    )
    .unwrap();

    let schema = TimeSeriesSchema::new("analytics", None);
    let intervals = vec![interval];
    let _ = TimeSeriesTable::create(
        &Arc::downgrade(&schema),
        "events",
        map_row_type(FieldMap::new()),
        &BTreeSet::new(),
        None,
        Some(intervals.as_slice()),
    );
}

#[tokio::test]
async fn test_discovery_fills_empty_seed() {
    let mut source = MockSource::new();
    source
        .expect_metadata()
        .withf(|data_source, timestamp_column, _| {
            data_source.to_string() == "sales" && timestamp_column.to_string() == "__time"
        })
        .times(1)
        .returning(|_, _, metadata| {
            metadata
                .fields
                .insert("__time".to_string(), ScalarType::Timestamp);
            metadata
                .fields
                .insert("revenue".to_string(), ScalarType::Double);
            metadata.metric_names.insert("revenue".to_string());
            Ok(())
        });

    let schema = TimeSeriesSchema::new("analytics", None);
    let mut fields = FieldMap::new();
    let mut metrics = BTreeSet::new();
    let table = TimeSeriesTable::create_with_discovery(
        &Arc::downgrade(&schema),
        "sales",
        None,
        &mut fields,
        &mut metrics,
        None,
        Some(&source as &dyn MetadataSource),
    )
    .await
    .unwrap();

    let row_type = table.row_type(&SqlTypeFactory::new()).unwrap();
    assert_eq!(row_type.field_names(), vec!["__time", "revenue"]);
    assert_eq!(table.metric_field_names(), &name_set(&["revenue"]));
}

#[tokio::test]
async fn test_discovery_receives_caller_seed() {
    let mut source = MockSource::new();
    source
        .expect_metadata()
        .withf(|_, _, metadata| {
            metadata.fields.get("city") == Some(&ScalarType::Varchar)
                && metadata.metric_names.contains("visits")
        })
        .times(1)
        .returning(|_, _, metadata| {
            metadata
                .fields
                .insert("__time".to_string(), ScalarType::Timestamp);
            metadata
                .fields
                .insert("visits".to_string(), ScalarType::BigInt);
            Ok(())
        });

    let schema = TimeSeriesSchema::new("analytics", None);
    let mut fields = field_map(&[("city", ScalarType::Varchar)]);
    let mut metrics = name_set(&["visits"]);
    let table = TimeSeriesTable::create_with_discovery(
        &Arc::downgrade(&schema),
        "visits",
        None,
        &mut fields,
        &mut metrics,
        None,
        Some(&source as &dyn MetadataSource),
    )
    .await
    .unwrap();

    // the caller's collections hold the enriched seed afterwards
    assert_eq!(fields.len(), 3);
    assert_eq!(metrics, name_set(&["visits"]));
    let row_type = table.row_type(&SqlTypeFactory::new()).unwrap();
    assert_eq!(row_type.field_names(), vec!["__time", "city", "visits"]);
}

#[tokio::test]
async fn test_discovery_error_is_unchanged() {
    let mut source = MockSource::new();
    source.expect_metadata().returning(|data_source, _, _| {
        Err(MetadataError::UnknownDataSource {
            data_source: data_source.to_string(),
        })
    });

    let schema = TimeSeriesSchema::new("analytics", None);
    let result = TimeSeriesTable::create_with_discovery(
        &Arc::downgrade(&schema),
        "ghost",
        None,
        &mut FieldMap::new(),
        &mut BTreeSet::new(),
        None,
        Some(&source as &dyn MetadataSource),
    )
    .await;

    match result {
        Err(CatalogError::Metadata(MetadataError::UnknownDataSource { data_source })) => {
            assert_eq!(data_source, "ghost")
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
