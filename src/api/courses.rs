//! Course HTTP Routes
//!
//! Every course write recomputes the parent bootcamp's `averageCost`.

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
use crate::store::{id_of, DocumentStore};

use super::advanced::{advanced_results, courses_of, Populate};
use super::documents::{
    number_value, one_of, optional_number, optional_text, required_number, required_text,
    writable_fields,
};
use super::errors::{ApiError, ApiResult};
use super::guard::require_role;
use super::response::Envelope;
use super::server::SharedState;
use super::{BOOTCAMPS, COURSES};

const SKILLS: [&str; 3] = ["beginner", "intermediate", "advanced"];

const PROTECTED: [&str; 2] = ["bootcamp", OWNER_FIELD];

/// Create course routes
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/courses", get(list_courses_handler))
        .route(
            "/courses/:id",
            get(get_course_handler)
                .put(update_course_handler)
                .delete(delete_course_handler),
        )
        .route(
            "/bootcamps/:id/courses",
            get(bootcamp_courses_handler).post(add_course_handler),
        )
}

/// Mean tuition rounded up to the next multiple of ten
pub fn average_cost(tuitions: &[f64]) -> Option<f64> {
    if tuitions.is_empty() {
        return None;
    }
    let mean = tuitions.iter().sum::<f64>() / tuitions.len() as f64;
    Some((mean / 10.0).ceil() * 10.0)
}

/// Recompute a bootcamp's `averageCost` from its courses; null when it has none
pub fn refresh_average_cost(store: &dyn DocumentStore, bootcamp_id: &str) -> ApiResult<()> {
    let tuitions: Vec<f64> = courses_of(store, bootcamp_id)?
        .iter()
        .filter_map(|c| c.get("tuition").and_then(Value::as_f64))
        .collect();

    let cost = average_cost(&tuitions).map_or(Value::Null, number_value);
    store.update(BOOTCAMPS, bootcamp_id, json!({ "averageCost": cost }))?;
    Ok(())
}

/// Validate a course body; `creating` requires every field
fn validate_course(fields: &mut Map<String, Value>, creating: bool) -> ApiResult<()> {
    if creating {
        required_text(fields, "title", 100)?;
        required_text(fields, "description", 1000)?;
        required_number(fields, "weeks")?;
        required_number(fields, "tuition")?;
        if !fields.contains_key("minimumSkill") {
            return Err(ApiError::BadRequest("Please add a minimumSkill".to_string()));
        }
    } else {
        optional_text(fields, "title", 100)?;
        optional_text(fields, "description", 1000)?;
        optional_number(fields, "weeks")?;
        optional_number(fields, "tuition")?;
    }

    if let Some(tuition) = fields.get("tuition").and_then(Value::as_f64) {
        if tuition < 0.0 {
            return Err(ApiError::BadRequest("tuition must not be negative".to_string()));
        }
    }
    one_of(fields, "minimumSkill", &SKILLS)?;
    if creating {
        fields
            .entry("scholarshipAvailable")
            .or_insert(Value::Bool(false));
    }
    Ok(())
}

fn find_course(state: &SharedState, id: &str) -> ApiResult<Value> {
    state
        .store
        .find_by_id(COURSES, id)?
        .ok_or_else(|| ApiError::NotFound(format!("No course with the id of {}", id)))
}

fn bootcamp_of(course: &Value) -> Option<String> {
    course.get("bootcamp").and_then(Value::as_str).map(str::to_string)
}

async fn list_courses_handler(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Envelope<Vec<Value>>>> {
    let result = advanced_results(state.store.as_ref(), COURSES, &params, Populate::Bootcamp)?;
    Ok(Json(result))
}

/// All courses of one bootcamp, without paging
async fn bootcamp_courses_handler(
    State(state): State<SharedState>,
    Path(bootcamp_id): Path<String>,
) -> ApiResult<Json<Envelope<Vec<Value>>>> {
    let courses = courses_of(state.store.as_ref(), &bootcamp_id)?;
    Ok(Json(Envelope::list(courses)))
}

async fn get_course_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<Value>>> {
    let mut course = find_course(&state, &id)?;
    Populate::Bootcamp.apply(state.store.as_ref(), std::slice::from_mut(&mut course))?;
    Ok(Json(Envelope::single(course)))
}

/// Add a course to a bootcamp the caller owns
async fn add_course_handler(
    State(state): State<SharedState>,
    Path(bootcamp_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<Value>>)> {
    let principal = require_role(&state, &headers, &[Role::Publisher, Role::Admin])?;
    let bootcamp = state
        .store
        .find_by_id(BOOTCAMPS, &bootcamp_id)?
        .ok_or_else(|| ApiError::NotFound(format!("No bootcamp with the id of {}", bootcamp_id)))?;
    principal.ensure_owner(&bootcamp, &format!("add a course to bootcamp {}", bootcamp_id))?;

    let Json(body) = payload?;
    let mut fields = writable_fields(body, &PROTECTED)?;
    validate_course(&mut fields, true)?;
    fields.insert("bootcamp".to_string(), Value::String(bootcamp_id.clone()));
    fields.insert(OWNER_FIELD.to_string(), Value::String(principal.user_id.clone()));

    let course = state.store.insert(COURSES, Value::Object(fields))?;
    refresh_average_cost(state.store.as_ref(), &bootcamp_id)?;

    info!(
        id = id_of(&course).unwrap_or_default(),
        bootcamp = %bootcamp_id,
        "course added"
    );
    Ok((StatusCode::CREATED, Json(Envelope::single(course))))
}

async fn update_course_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Envelope<Value>>> {
    let principal = require_role(&state, &headers, &[Role::Publisher, Role::Admin])?;
    let course = find_course(&state, &id)?;
    principal.ensure_owner(&course, &format!("update course {}", id))?;

    let Json(body) = payload?;
    let mut fields = writable_fields(body, &PROTECTED)?;
    validate_course(&mut fields, false)?;

    let updated = state
        .store
        .update(COURSES, &id, Value::Object(fields))?
        .ok_or_else(|| ApiError::NotFound(format!("No course with the id of {}", id)))?;
    if let Some(bootcamp_id) = bootcamp_of(&updated) {
        refresh_average_cost(state.store.as_ref(), &bootcamp_id)?;
    }
    Ok(Json(Envelope::single(updated)))
}

async fn delete_course_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Envelope<Value>>> {
    let principal = require_role(&state, &headers, &[Role::Publisher, Role::Admin])?;
    let course = find_course(&state, &id)?;
    principal.ensure_owner(&course, &format!("delete course {}", id))?;

    state.store.delete(COURSES, &id)?;
    if let Some(bootcamp_id) = bootcamp_of(&course) {
        refresh_average_cost(state.store.as_ref(), &bootcamp_id)?;
    }
    info!(id = %id, "course deleted");
    Ok(Json(Envelope::empty()))
}
