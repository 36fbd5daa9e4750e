//! # Advanced Results
//!
//! Shared list pipeline for every resource:
//! translate -> count -> execute -> populate -> pagination.

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::debug;

use crate::query::{Predicate, Projection, QueryPlan};
use crate::store::{id_of, DocumentStore, ID_FIELD};

use super::errors::ApiResult;
use super::response::Envelope;
use super::{BOOTCAMPS, COURSES};

/// Related documents attached to each result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Populate {
    None,
    /// Bootcamps get their `courses` array (reverse relation)
    Courses,
    /// Child documents get their `bootcamp` reference expanded to `name, description`
    Bootcamp,
}

impl Populate {
    pub fn apply(self, store: &dyn DocumentStore, docs: &mut [Value]) -> ApiResult<()> {
        match self {
            Populate::None => {}
            Populate::Courses => {
                for doc in docs.iter_mut() {
                    let Some(id) = id_of(doc).map(str::to_string) else {
                        continue;
                    };
                    let courses = courses_of(store, &id)?;
                    if let Some(obj) = doc.as_object_mut() {
                        obj.insert(COURSES.to_string(), Value::Array(courses));
                    }
                }
            }
            Populate::Bootcamp => {
                for doc in docs.iter_mut() {
                    let Some(id) = doc.get("bootcamp").and_then(Value::as_str).map(str::to_string)
                    else {
                        continue;
                    };
                    let summary = bootcamp_summary(store, &id)?;
                    if let Some(obj) = doc.as_object_mut() {
                        obj.insert("bootcamp".to_string(), summary);
                    }
                }
            }
        }
        Ok(())
    }
}

/// All courses of a bootcamp, newest first
pub fn courses_of(store: &dyn DocumentStore, bootcamp_id: &str) -> ApiResult<Vec<Value>> {
    Ok(store.execute(
        COURSES,
        &QueryPlan::unbounded(Predicate::eq("bootcamp", bootcamp_id)),
    )?)
}

/// `{_id, name, description}` of a bootcamp, or null when it is gone
pub fn bootcamp_summary(store: &dyn DocumentStore, bootcamp_id: &str) -> ApiResult<Value> {
    let mut plan = QueryPlan::unbounded(Predicate::eq(ID_FIELD, bootcamp_id));
    plan.projection = Projection::Fields(vec!["name".to_string(), "description".to_string()]);

    Ok(store
        .execute(BOOTCAMPS, &plan)?
        .into_iter()
        .next()
        .unwrap_or(json!(null)))
}

/// Run an already translated plan
pub fn run_plan(
    store: &dyn DocumentStore,
    collection: &str,
    plan: &QueryPlan,
    populate: Populate,
) -> ApiResult<Envelope<Vec<Value>>> {
    let total = store.count(collection, &plan.predicate)?;
    let mut docs = store.execute(collection, plan)?;
    populate.apply(store, &mut docs)?;

    Ok(Envelope::page(docs, plan.pagination(total)))
}

/// Translate the query string and run it against `collection`
pub fn advanced_results(
    store: &dyn DocumentStore,
    collection: &str,
    params: &HashMap<String, String>,
    populate: Populate,
) -> ApiResult<Envelope<Vec<Value>>> {
    let plan = QueryPlan::translate(params)?;
    debug!(
        collection,
        filter = %plan.predicate.to_document(),
        page = plan.page,
        limit = plan.limit,
        "advanced results"
    );
    run_plan(store, collection, &plan, populate)
}
