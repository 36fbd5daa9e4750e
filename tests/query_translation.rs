//! Query Translation Tests
//!
//! Drives the translator through the public API and runs the resulting
//! plans against the in-memory store.

use std::collections::HashMap;

use serde_json::{json, Value};

use campdir::geo::{build_radius_predicate, StaticGeocoder};
use campdir::query::{
    FilterNode, PageRef, Predicate, Projection, QueryError, QueryPlan, SortKey,
};
use campdir::store::{DocumentStore, MemoryStore};

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn store_with_prices(count: usize, price: u64) -> MemoryStore {
    let store = MemoryStore::new();
    for i in 0..count {
        store
            .insert(
                "bootcamps",
                json!({
                    "name": format!("Camp {:02}", i),
                    "price": price,
                    "rank": i,
                }),
            )
            .unwrap();
    }
    store
}

// =============================================================================
// END-TO-END
// =============================================================================

/// price filter, projection, descending sort and page 2 of 10 over 30 matches.
#[test]
fn test_end_to_end_page_two() {
    let plan = QueryPlan::translate(&params(&[
        ("price", "100"),
        ("select", "name,price"),
        ("sort", "-price"),
        ("page", "2"),
        ("limit", "10"),
    ]))
    .unwrap();

    assert_eq!(plan.predicate, Predicate::eq("price", "100"));
    assert_eq!(
        plan.projection,
        Projection::Fields(vec!["name".to_string(), "price".to_string()])
    );
    assert_eq!(plan.sort, vec![SortKey::desc("price")]);
    assert_eq!(plan.window().offset, 10);
    assert_eq!(plan.window().limit, 10);

    let store = store_with_prices(30, 100);
    let total = store.count("bootcamps", &plan.predicate).unwrap();
    assert_eq!(total, 30);

    let pagination = plan.pagination(total);
    assert_eq!(pagination.next, Some(PageRef { page: 3, limit: 10 }));
    assert_eq!(pagination.prev, Some(PageRef { page: 1, limit: 10 }));

    let page = store.execute("bootcamps", &plan).unwrap();
    assert_eq!(page.len(), 10);
    for doc in &page {
        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3, "unexpected fields in {}", doc);
        assert!(doc.get("rank").is_none());
        assert_eq!(doc["price"], json!(100));
    }
}

// =============================================================================
// FILTERS
// =============================================================================

#[test]
fn test_filter_values_are_passed_unmodified() {
    let plan = QueryPlan::translate(&params(&[
        ("housing", "true"),
        ("location.state", "MA"),
    ]))
    .unwrap();

    assert_eq!(plan.predicate.len(), 2);
    assert_eq!(plan.predicate.get("housing"), Some(&FilterNode::literal("true")));
    assert_eq!(
        plan.predicate.get("location.state"),
        Some(&FilterNode::literal("MA"))
    );
}

#[test]
fn test_comparison_filters_evaluate_numerically() {
    let store = MemoryStore::new();
    for cost in [5000, 8000, 9000, 12000] {
        store
            .insert("bootcamps", json!({"averageCost": cost}))
            .unwrap();
    }

    let plan = QueryPlan::translate(&params(&[("averageCost[lte]", "9000")])).unwrap();
    let mut costs: Vec<Value> = store
        .execute("bootcamps", &plan)
        .unwrap()
        .into_iter()
        .map(|d| d["averageCost"].clone())
        .collect();
    costs.sort_by_key(|v| v.as_i64());
    assert_eq!(costs, vec![json!(5000), json!(8000), json!(9000)]);

    let plan = QueryPlan::translate(&params(&[("averageCost[in]", "5000,12000")])).unwrap();
    assert_eq!(store.count("bootcamps", &plan.predicate).unwrap(), 2);
}

#[test]
fn test_malformed_key_is_invalid_query() {
    let err = QueryPlan::translate(&params(&[("price[gt", "1")])).unwrap_err();
    assert!(matches!(err, QueryError::InvalidQuery(_)));
    assert_eq!(err.status_code(), 400);
}

// =============================================================================
// PAGINATION BOUNDARIES
// =============================================================================

#[test]
fn test_first_and_last_pages() {
    let first = QueryPlan::translate(&params(&[])).unwrap().pagination(100);
    assert_eq!(first.next, Some(PageRef { page: 2, limit: 25 }));
    assert_eq!(first.prev, None);

    let last = QueryPlan::translate(&params(&[("page", "4")]))
        .unwrap()
        .pagination(100);
    assert_eq!(last.next, None);
    assert_eq!(last.prev, Some(PageRef { page: 3, limit: 25 }));
}

#[test]
fn test_non_positive_paging_falls_back() {
    let plan = QueryPlan::translate(&params(&[("page", "0"), ("limit", "-5")])).unwrap();
    assert_eq!(plan.page, 1);
    assert_eq!(plan.limit, 25);
    assert_eq!(plan.window().offset, 0);
}

// =============================================================================
// RADIUS
// =============================================================================

#[test]
fn test_radius_plan_selects_nearby_documents() {
    let store = MemoryStore::new();
    store
        .insert(
            "bootcamps",
            json!({"name": "Boston", "location": {"type": "Point", "coordinates": [-71.1054, 42.3505]}}),
        )
        .unwrap();
    store
        .insert(
            "bootcamps",
            json!({"name": "Los Angeles", "location": {"type": "Point", "coordinates": [-118.41, 34.09]}}),
        )
        .unwrap();

    let geocoder = StaticGeocoder::new().with_entry("02118", 42.3396, -71.0702);
    let radius = build_radius_predicate("02118", 10.0, &geocoder).unwrap();
    assert_eq!(radius.radius_radians, 10.0 / 3963.0);

    let plan = QueryPlan::unbounded(Predicate::new().and("location", FilterNode::GeoWithin(radius)));
    let found = store.execute("bootcamps", &plan).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], json!("Boston"));

    assert!(matches!(
        build_radius_predicate("00000", 10.0, &geocoder),
        Err(QueryError::LocationNotFound(_))
    ));
}
