//! Review HTTP Routes
//!
//! A user reviews a bootcamp at most once. Every review write recomputes
//! the bootcamp's `averageRating`.

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::auth::{Role, OWNER_FIELD};
use crate::query::{FilterNode, Predicate, QueryPlan};
use crate::store::{id_of, DocumentStore};

use super::advanced::{advanced_results, Populate};
use super::documents::{number_value, optional_number, optional_text, required_text, writable_fields};
use super::errors::{ApiError, ApiResult};
use super::guard::require_role;
use super::response::Envelope;
use super::server::SharedState;
use super::{BOOTCAMPS, REVIEWS};

const TITLE_MAX: usize = 100;
const TEXT_MAX: usize = 2000;

const PROTECTED: [&str; 2] = ["bootcamp", OWNER_FIELD];

/// Create review routes
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/reviews", get(list_reviews_handler))
        .route(
            "/reviews/:id",
            get(get_review_handler)
                .put(update_review_handler)
                .delete(delete_review_handler),
        )
        .route(
            "/bootcamps/:id/reviews",
            get(bootcamp_reviews_handler).post(add_review_handler),
        )
}

/// All reviews of a bootcamp, newest first
pub fn reviews_of(store: &dyn DocumentStore, bootcamp_id: &str) -> ApiResult<Vec<Value>> {
    Ok(store.execute(
        REVIEWS,
        &QueryPlan::unbounded(Predicate::eq("bootcamp", bootcamp_id)),
    )?)
}

/// Recompute a bootcamp's `averageRating`; null when it has no reviews
pub fn refresh_average_rating(store: &dyn DocumentStore, bootcamp_id: &str) -> ApiResult<()> {
    let ratings: Vec<f64> = reviews_of(store, bootcamp_id)?
        .iter()
        .filter_map(|r| r.get("rating").and_then(Value::as_f64))
        .collect();

    let rating = if ratings.is_empty() {
        Value::Null
    } else {
        number_value(ratings.iter().sum::<f64>() / ratings.len() as f64)
    };
    store.update(BOOTCAMPS, bootcamp_id, json!({ "averageRating": rating }))?;
    Ok(())
}

fn validate_review(fields: &mut Map<String, Value>, creating: bool) -> ApiResult<()> {
    if creating {
        required_text(fields, "title", TITLE_MAX)?;
        required_text(fields, "text", TEXT_MAX)?;
    } else {
        optional_text(fields, "title", TITLE_MAX)?;
        optional_text(fields, "text", TEXT_MAX)?;
    }

    match optional_number(fields, "rating")? {
        Some(rating) if rating.fract() == 0.0 && (1.0..=10.0).contains(&rating) => Ok(()),
        Some(_) => Err(ApiError::BadRequest(
            "Please add a rating between 1 and 10".to_string(),
        )),
        None if creating => Err(ApiError::BadRequest(
            "Please add a rating between 1 and 10".to_string(),
        )),
        None => Ok(()),
    }
}

fn find_review(state: &SharedState, id: &str) -> ApiResult<Value> {
    state
        .store
        .find_by_id(REVIEWS, id)?
        .ok_or_else(|| ApiError::NotFound(format!("No review found with id of {}", id)))
}

fn bootcamp_of(review: &Value) -> Option<String> {
    review.get("bootcamp").and_then(Value::as_str).map(str::to_string)
}

async fn list_reviews_handler(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Envelope<Vec<Value>>>> {
    let result = advanced_results(state.store.as_ref(), REVIEWS, &params, Populate::Bootcamp)?;
    Ok(Json(result))
}

async fn bootcamp_reviews_handler(
    State(state): State<SharedState>,
    Path(bootcamp_id): Path<String>,
) -> ApiResult<Json<Envelope<Vec<Value>>>> {
    let reviews = reviews_of(state.store.as_ref(), &bootcamp_id)?;
    Ok(Json(Envelope::list(reviews)))
}

async fn get_review_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<Value>>> {
    let mut review = find_review(&state, &id)?;
    Populate::Bootcamp.apply(state.store.as_ref(), std::slice::from_mut(&mut review))?;
    Ok(Json(Envelope::single(review)))
}

async fn add_review_handler(
    State(state): State<SharedState>,
    Path(bootcamp_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<Value>>)> {
    let principal = require_role(&state, &headers, &[Role::User, Role::Admin])?;
    if state.store.find_by_id(BOOTCAMPS, &bootcamp_id)?.is_none() {
        return Err(ApiError::NotFound(format!(
            "No bootcamp with the id of {}",
            bootcamp_id
        )));
    }

    let existing = Predicate::eq("bootcamp", bootcamp_id.as_str())
        .and(OWNER_FIELD, FilterNode::literal(principal.user_id.as_str()));
    if state.store.find_one(REVIEWS, &existing)?.is_some() {
        return Err(ApiError::BadRequest(format!(
            "User {} has already reviewed bootcamp {}",
            principal.user_id, bootcamp_id
        )));
    }

    let Json(body) = payload?;
    let mut fields = writable_fields(body, &PROTECTED)?;
    validate_review(&mut fields, true)?;
    fields.insert("bootcamp".to_string(), Value::String(bootcamp_id.clone()));
    fields.insert(OWNER_FIELD.to_string(), Value::String(principal.user_id.clone()));

    let review = state.store.insert(REVIEWS, Value::Object(fields))?;
    refresh_average_rating(state.store.as_ref(), &bootcamp_id)?;

    info!(
        id = id_of(&review).unwrap_or_default(),
        bootcamp = %bootcamp_id,
        user = %principal.user_id,
        "review added"
    );
    Ok((StatusCode::CREATED, Json(Envelope::single(review))))
}

async fn update_review_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Envelope<Value>>> {
    let principal = require_role(&state, &headers, &[Role::User, Role::Admin])?;
    let review = find_review(&state, &id)?;
    principal.ensure_owner(&review, "update this review")?;

    let Json(body) = payload?;
    let mut fields = writable_fields(body, &PROTECTED)?;
    validate_review(&mut fields, false)?;

    let updated = state
        .store
        .update(REVIEWS, &id, Value::Object(fields))?
        .ok_or_else(|| ApiError::NotFound(format!("No review found with id of {}", id)))?;
    if let Some(bootcamp_id) = bootcamp_of(&updated) {
        refresh_average_rating(state.store.as_ref(), &bootcamp_id)?;
    }
    Ok(Json(Envelope::single(updated)))
}

async fn delete_review_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Envelope<Value>>> {
    let principal = require_role(&state, &headers, &[Role::User, Role::Admin])?;
    let review = find_review(&state, &id)?;
    principal.ensure_owner(&review, "delete this review")?;

    state.store.delete(REVIEWS, &id)?;
    if let Some(bootcamp_id) = bootcamp_of(&review) {
        refresh_average_rating(state.store.as_ref(), &bootcamp_id)?;
    }
    info!(id = %id, "review deleted");
    Ok(Json(Envelope::empty()))
}
