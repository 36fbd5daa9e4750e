//! # In-Memory Store
//!
//! `DocumentStore` over a map of collections held behind a lock.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::{id_of, DocumentStore, CREATED_AT_FIELD, ID_FIELD};
use crate::query::filter::lookup_path;
use crate::query::{Predicate, Projection, QueryPlan, SortDirection, SortKey};

/// In-memory document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Data: collection -> documents in insertion order
    data: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<T>(_: T) -> StoreError {
        StoreError::Internal("Lock poisoned".to_string())
    }

    /// Apply ordering
    fn apply_ordering(records: &mut [Value], sort: &[SortKey]) {
        if sort.is_empty() {
            return;
        }

        records.sort_by(|a, b| {
            for key in sort {
                let cmp = compare_values(lookup_path(a, &key.field), lookup_path(b, &key.field));
                let cmp = match key.direction {
                    SortDirection::Ascending => cmp,
                    SortDirection::Descending => cmp.reverse(),
                };
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });
    }

    /// Apply pagination
    fn apply_pagination(records: Vec<Value>, plan: &QueryPlan) -> Vec<Value> {
        let window = plan.window();
        records
            .into_iter()
            .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(window.limit).unwrap_or(usize::MAX))
            .collect()
    }

    /// Select fields from records; `_id` is always kept
    fn select_fields(records: Vec<Value>, projection: &Projection) -> Vec<Value> {
        let fields = match projection {
            Projection::All => return records,
            Projection::Fields(fields) => fields,
        };

        let keep: Vec<&str> = fields
            .iter()
            .map(|f| f.split('.').next().unwrap_or(f))
            .collect();

        records
            .into_iter()
            .map(|r| match r {
                Value::Object(obj) => Value::Object(
                    obj.into_iter()
                        .filter(|(k, _)| k == ID_FIELD || keep.contains(&k.as_str()))
                        .collect(),
                ),
                other => other,
            })
            .collect()
    }
}

impl DocumentStore for MemoryStore {
    fn execute(&self, collection: &str, plan: &QueryPlan) -> StoreResult<Vec<Value>> {
        let data = self.data.read().map_err(Self::poisoned)?;

        let mut records: Vec<Value> = data
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| plan.predicate.matches(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Self::apply_ordering(&mut records, &plan.sort);
        let records = Self::apply_pagination(records, plan);
        Ok(Self::select_fields(records, &plan.projection))
    }

    fn count(&self, collection: &str, predicate: &Predicate) -> StoreResult<u64> {
        let data = self.data.read().map_err(Self::poisoned)?;
        Ok(data
            .get(collection)
            .map_or(0, |docs| docs.iter().filter(|d| predicate.matches(d)).count()) as u64)
    }

    fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let data = self.data.read().map_err(Self::poisoned)?;
        Ok(data
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| id_of(d) == Some(id)))
            .cloned())
    }

    fn find_one(&self, collection: &str, predicate: &Predicate) -> StoreResult<Option<Value>> {
        let data = self.data.read().map_err(Self::poisoned)?;
        Ok(data
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| predicate.matches(d)))
            .cloned())
    }

    fn insert(&self, collection: &str, doc: Value) -> StoreResult<Value> {
        let Value::Object(mut obj) = doc else {
            return Err(StoreError::InvalidDocument(
                "document must be a JSON object".to_string(),
            ));
        };

        if !matches!(obj.get(ID_FIELD), Some(Value::String(_))) {
            obj.insert(
                ID_FIELD.to_string(),
                Value::String(Uuid::new_v4().simple().to_string()),
            );
        }
        if !obj.contains_key(CREATED_AT_FIELD) {
            obj.insert(
                CREATED_AT_FIELD.to_string(),
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }
        let doc = Value::Object(obj);

        let mut store = self.data.write().map_err(Self::poisoned)?;
        let docs = store.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| id_of(d) == id_of(&doc)) {
            return Err(StoreError::DuplicateKey(format!(
                "{} already contains {}",
                collection,
                id_of(&doc).unwrap_or_default()
            )));
        }
        docs.push(doc.clone());
        Ok(doc)
    }

    fn update(&self, collection: &str, id: &str, changes: Value) -> StoreResult<Option<Value>> {
        let Value::Object(changes) = changes else {
            return Err(StoreError::InvalidDocument(
                "update must be a JSON object".to_string(),
            ));
        };

        let mut store = self.data.write().map_err(Self::poisoned)?;
        let record = match store
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| id_of(d) == Some(id)))
        {
            Some(record) => record,
            None => return Ok(None),
        };

        if let Some(obj) = record.as_object_mut() {
            merge(obj, changes);
        }
        Ok(Some(record.clone()))
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let mut store = self.data.write().map_err(Self::poisoned)?;
        let Some(docs) = store.get_mut(collection) else {
            return Ok(false);
        };
        match docs.iter().position(|d| id_of(d) == Some(id)) {
            Some(idx) => {
                docs.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_many(&self, collection: &str, predicate: &Predicate) -> StoreResult<u64> {
        let mut store = self.data.write().map_err(Self::poisoned)?;
        let Some(docs) = store.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !predicate.matches(d));
        Ok((before - docs.len()) as u64)
    }
}

/// Merge top-level keys; the identity field never changes
fn merge(target: &mut Map<String, Value>, changes: Map<String, Value>) {
    for (key, value) in changes {
        if key != ID_FIELD {
            target.insert(key, value);
        }
    }
}

/// Ordering used for sorting: missing/null first, then numbers, then strings
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (a, b) => rank(a).cmp(&rank(b)),
    }
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ComparisonOperator, FilterNode};
    use serde_json::json;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (i, (name, cost)) in [("Alpha", 9000), ("Bravo", 12000), ("Charlie", 4000), ("Delta", 7000)]
            .into_iter()
            .enumerate()
        {
            store
                .insert(
                    "bootcamps",
                    json!({
                        "name": name,
                        "averageCost": cost,
                        "createdAt": format!("2024-01-0{}T00:00:00.000Z", i + 1),
                    }),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn test_insert_assigns_identity_and_timestamp() {
        let store = MemoryStore::new();
        let doc = store.insert("courses", json!({"title": "Rust"})).unwrap();

        let id = id_of(&doc).unwrap().to_string();
        assert_eq!(id.len(), 32);
        assert!(doc[CREATED_AT_FIELD].is_string());
        assert_eq!(store.find_by_id("courses", &id).unwrap().unwrap()["title"], "Rust");
    }

    #[test]
    fn test_insert_rejects_duplicates_and_non_objects() {
        let store = MemoryStore::new();
        store.insert("users", json!({"_id": "u1"})).unwrap();
        assert!(matches!(
            store.insert("users", json!({"_id": "u1"})),
            Err(StoreError::DuplicateKey(_))
        ));
        assert!(matches!(
            store.insert("users", json!([1, 2])),
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_default_plan_sorts_newest_first() {
        let store = seeded();
        let docs = store
            .execute("bootcamps", &QueryPlan::with_predicate(Predicate::new()))
            .unwrap();
        let names: Vec<_> = docs.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Delta", "Charlie", "Bravo", "Alpha"]);
    }

    #[test]
    fn test_filter_sort_select_and_page() {
        let store = seeded();
        let mut plan = QueryPlan::with_predicate(Predicate::new().and(
            "averageCost",
            FilterNode::compare(ComparisonOperator::Gte, "5000"),
        ));
        plan.sort = vec![SortKey::asc("averageCost")];
        plan.projection = Projection::Fields(vec!["name".to_string()]);
        plan.page = 2;
        plan.limit = 2;

        let docs = store.execute("bootcamps", &plan).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["name"], "Bravo");
        assert!(docs[0].get("averageCost").is_none());
        assert!(docs[0].get(ID_FIELD).is_some());

        assert_eq!(store.count("bootcamps", &plan.predicate).unwrap(), 3);
    }

    #[test]
    fn test_missing_sort_field_orders_first() {
        let store = MemoryStore::new();
        store.insert("c", json!({"_id": "a", "rank": 2})).unwrap();
        store.insert("c", json!({"_id": "b"})).unwrap();
        store.insert("c", json!({"_id": "c", "rank": 1})).unwrap();

        let mut plan = QueryPlan::with_predicate(Predicate::new());
        plan.sort = vec![SortKey::asc("rank")];
        let ids: Vec<_> = store
            .execute("c", &plan)
            .unwrap()
            .iter()
            .map(|d| id_of(d).unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_update_merges_and_keeps_id() {
        let store = MemoryStore::new();
        store.insert("c", json!({"_id": "x", "a": 1, "b": 2})).unwrap();

        let updated = store
            .update("c", "x", json!({"_id": "y", "b": 3, "c": 4}))
            .unwrap()
            .unwrap();
        assert_eq!(updated["_id"], "x");
        assert_eq!(updated["a"], 1);
        assert_eq!(updated["b"], 3);
        assert_eq!(updated["c"], 4);

        assert!(store.update("c", "nope", json!({})).unwrap().is_none());
    }

    #[test]
    fn test_delete_and_delete_many() {
        let store = seeded();
        let victim = store
            .find_one("bootcamps", &Predicate::eq("name", "Alpha"))
            .unwrap()
            .unwrap();
        assert!(store.delete("bootcamps", id_of(&victim).unwrap()).unwrap());
        assert!(!store.delete("bootcamps", id_of(&victim).unwrap()).unwrap());

        let removed = store
            .delete_many(
                "bootcamps",
                &Predicate::new().and(
                    "averageCost",
                    FilterNode::compare(ComparisonOperator::Lt, "10000"),
                ),
            )
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count("bootcamps", &Predicate::new()).unwrap(), 1);
        assert_eq!(store.delete_many("missing", &Predicate::new()).unwrap(), 0);
    }
}
