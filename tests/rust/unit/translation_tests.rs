//! Translating a time-series table into plan nodes

use std::sync::Arc;

use clickseries::query_planner::{Cluster, Convention, PlanningContext, RelNode, TableHandle};
use clickseries::table_catalog::{SqlTypeFactory, TimeSeriesSchema, TimeSeriesTable};

use super::common::page_views;

fn plan_page_views() -> (Arc<TimeSeriesTable>, TableHandle, RelNode) {
    let schema = TimeSeriesSchema::new("analytics", None);
    let table = page_views(&schema);
    let cluster = Cluster::new(Arc::new(SqlTypeFactory::new()));
    let handle = TableHandle::new(
        vec!["analytics".to_string(), "page_views".to_string()],
        table.row_type(cluster.type_factory()).unwrap(),
    );
    let rel = table.to_rel(&PlanningContext::new(cluster), &handle);
    (table, handle, rel)
}

#[test]
fn test_translation_wraps_single_scan() {
    let (table, handle, rel) = plan_page_views();

    let RelNode::TimeSeriesQuery(query) = &rel else {
        panic!("expected a time-series query, got {rel:?}");
    };
    assert_eq!(query.rels().len(), 1);
    assert_eq!(query.table(), &handle);
    assert!(Arc::ptr_eq(query.time_series_table(), &table));

    let scan = query.scan().expect("first rel should be a table scan");
    assert_eq!(scan.table(), &handle);
    assert_eq!(scan.table().name(), "page_views");
    assert!(Arc::ptr_eq(scan.cluster(), query.cluster()));
}

#[test]
fn test_translation_conventions() {
    let (_, _, rel) = plan_page_views();

    assert_eq!(rel.convention(), Convention::Bindable);
    assert_eq!(rel.inputs().len(), 1);
    assert_eq!(rel.inputs()[0].convention(), Convention::Logical);
    assert!(rel.inputs()[0].inputs().is_empty());
}

#[test]
fn test_translation_row_type_matches_handle() {
    let (_, handle, rel) = plan_page_views();
    assert_eq!(rel.row_type(), handle.row_type());
    assert_eq!(rel.inputs()[0].row_type(), handle.row_type());
}

#[test]
fn test_signature_and_display() {
    let (_, _, rel) = plan_page_views();

    if let RelNode::TimeSeriesQuery(query) = &rel {
        assert_eq!(query.signature(), "s");
    }

    let rendered = rel.to_string();
    let mut lines = rendered.lines();
    let root = lines.next().unwrap();
    assert!(root.starts_with("TimeSeriesQuery(table=[analytics, page_views]"));
    assert!(root.contains("timestamp=[__time]"));
    assert!(root.contains("metrics=[clicks]"));
    assert!(root.contains("intervals=[1900-01-01T00:00:00Z/3000-01-01T00:00:00Z]"));
    assert!(root.contains("signature=[s]"));
    assert_eq!(
        lines.next(),
        Some("└── TableScan(table=[analytics, page_views])")
    );
    assert_eq!(lines.next(), None);
}

#[test]
fn test_each_translation_builds_fresh_nodes() {
    let schema = TimeSeriesSchema::new("analytics", None);
    let table = page_views(&schema);
    let cluster = Cluster::new(Arc::new(SqlTypeFactory::new()));
    let handle = TableHandle::new(
        vec!["analytics".to_string(), "page_views".to_string()],
        table.row_type(cluster.type_factory()).unwrap(),
    );
    let context = PlanningContext::new(cluster);

    let first = table.to_rel(&context, &handle);
    let second = table.to_rel(&context, &handle);

    assert!(!Arc::ptr_eq(&first.inputs()[0], &second.inputs()[0]));
    match (&first, &second) {
        (RelNode::TimeSeriesQuery(a), RelNode::TimeSeriesQuery(b)) => {
            assert!(Arc::ptr_eq(a.time_series_table(), b.time_series_table()));
        }
        _ => panic!("both translations should be time-series queries"),
    }
}
