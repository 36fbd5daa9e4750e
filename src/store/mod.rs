//! # Document Store
//!
//! Execution interface consumed by the resource handlers. A query plan is
//! executed as find → select → sort → skip/limit; counting ignores paging.

pub mod errors;
pub mod memory;

use serde_json::Value;

use crate::query::{Predicate, QueryPlan};

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// Identity field of every document
pub const ID_FIELD: &str = "_id";

/// Creation timestamp set on insert (RFC 3339)
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Collection-oriented document store
pub trait DocumentStore: Send + Sync {
    /// Run a plan and return the selected page of projected documents
    fn execute(&self, collection: &str, plan: &QueryPlan) -> StoreResult<Vec<Value>>;

    /// Count documents matching a predicate
    fn count(&self, collection: &str, predicate: &Predicate) -> StoreResult<u64>;

    fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    /// First document (in insertion order) matching a predicate
    fn find_one(&self, collection: &str, predicate: &Predicate) -> StoreResult<Option<Value>>;

    /// Insert a document, assigning `_id` and `createdAt` when absent
    fn insert(&self, collection: &str, doc: Value) -> StoreResult<Value>;

    /// Merge `changes` into a document. `None` if the id does not exist.
    fn update(&self, collection: &str, id: &str, changes: Value) -> StoreResult<Option<Value>>;

    /// Remove a document. `false` if the id does not exist.
    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    /// Remove every document matching a predicate, returning how many went
    fn delete_many(&self, collection: &str, predicate: &Predicate) -> StoreResult<u64>;
}

/// Get a document's identity as a string
pub fn id_of(doc: &Value) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}
