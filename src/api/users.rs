//! User administration routes (admin only).

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::auth::crypto::hash_password;
use crate::auth::user::{is_valid_email, normalize_email, public_view, PASSWORD_FIELD};
use crate::auth::{AuthError, Registration, Role};
use crate::store::id_of;

use super::advanced::{advanced_results, Populate};
use super::auth_routes::ensure_email_free;
use super::documents::{optional_text, writable_fields};
use super::errors::{ApiError, ApiResult};
use super::guard::require_role;
use super::response::Envelope;
use super::server::SharedState;
use super::USERS;

const EDITABLE: [&str; 4] = ["name", "email", "role", PASSWORD_FIELD];

/// Create user admin routes
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/users", get(list_users_handler).post(create_user_handler))
        .route(
            "/users/:id",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
}

fn find_user(state: &SharedState, id: &str) -> ApiResult<Value> {
    state
        .store
        .find_by_id(USERS, id)?
        .ok_or_else(|| ApiError::NotFound(format!("No user with the id of {}", id)))
}

/// Validate and normalize an admin update to a user
fn prepare_update(
    state: &SharedState,
    id: &str,
    mut fields: Map<String, Value>,
) -> ApiResult<Map<String, Value>> {
    fields.retain(|key, _| EDITABLE.contains(&key.as_str()));
    optional_text(&mut fields, "name", 100)?;

    if let Some(email) = optional_text(&mut fields, "email", 254)? {
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail.into());
        }
        ensure_email_free(state.store.as_ref(), &email, Some(id))?;
        fields.insert("email".to_string(), Value::String(normalize_email(&email)));
    }

    if let Some(role) = fields.get("role") {
        let raw = role.as_str().unwrap_or_default();
        let role = Role::parse(raw).ok_or_else(|| AuthError::InvalidRole(raw.to_string()))?;
        fields.insert("role".to_string(), Value::String(role.as_str().to_string()));
    }

    if let Some(password) = fields.get(PASSWORD_FIELD) {
        let password = password.as_str().unwrap_or_default();
        state.password_policy.validate(password)?;
        let hash = hash_password(password)?;
        fields.insert(PASSWORD_FIELD.to_string(), Value::String(hash));
    }

    Ok(fields)
}

async fn list_users_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Envelope<Vec<Value>>>> {
    require_role(&state, &headers, &[Role::Admin])?;

    let mut result = advanced_results(state.store.as_ref(), USERS, &params, Populate::None)?;
    result.data = result.data.into_iter().map(public_view).collect();
    Ok(Json(result))
}

async fn get_user_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Envelope<Value>>> {
    require_role(&state, &headers, &[Role::Admin])?;
    Ok(Json(Envelope::single(public_view(find_user(&state, &id)?))))
}

/// Create a user of any role
async fn create_user_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<Value>>)> {
    let admin = require_role(&state, &headers, &[Role::Admin])?;
    let Json(registration) = payload?;
    registration.validate(&state.password_policy, true)?;
    ensure_email_free(state.store.as_ref(), &registration.email, None)?;

    let user = state
        .store
        .insert(USERS, registration.into_document(&state.password_policy, true)?)?;

    info!(
        id = id_of(&user).unwrap_or_default(),
        by = %admin.user_id,
        "user created"
    );
    Ok((StatusCode::CREATED, Json(Envelope::single(public_view(user)))))
}

async fn update_user_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Envelope<Value>>> {
    require_role(&state, &headers, &[Role::Admin])?;
    find_user(&state, &id)?;

    let Json(body) = payload?;
    let fields = prepare_update(&state, &id, writable_fields(body, &[])?)?;

    let updated = state
        .store
        .update(USERS, &id, Value::Object(fields))?
        .ok_or_else(|| ApiError::NotFound(format!("No user with the id of {}", id)))?;
    Ok(Json(Envelope::single(public_view(updated))))
}

async fn delete_user_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Envelope<Value>>> {
    let admin = require_role(&state, &headers, &[Role::Admin])?;
    find_user(&state, &id)?;

    state.store.delete(USERS, &id)?;
    info!(id = %id, by = %admin.user_id, "user deleted");
    Ok(Json(Envelope::empty()))
}
