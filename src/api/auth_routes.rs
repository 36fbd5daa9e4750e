//! Auth HTTP Routes
//!
//! Registration, login and the current-user lookup. Tokens are stateless
//! JWTs; logging out is the client discarding its token.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::info;

use crate::auth::crypto::verify_password;
use crate::auth::user::{normalize_email, public_view, PASSWORD_FIELD};
use crate::auth::{AuthError, Credentials, Registration, Role, TokenResponse};
use crate::query::Predicate;
use crate::store::{id_of, DocumentStore};

use super::errors::{ApiError, ApiResult};
use super::guard::authenticate;
use super::response::Envelope;
use super::server::{AppState, SharedState};
use super::USERS;

/// Auth routes, nested under `/auth`
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/me", get(me_handler))
}

/// Fail when another user already holds `email`
pub fn ensure_email_free(
    store: &dyn DocumentStore,
    email: &str,
    except: Option<&str>,
) -> ApiResult<()> {
    match store.find_one(USERS, &Predicate::eq("email", normalize_email(email)))? {
        Some(existing) if id_of(&existing) != except => Err(AuthError::EmailAlreadyExists.into()),
        _ => Ok(()),
    }
}

/// Sign a token for a stored user
pub fn issue_token(state: &AppState, user: &Value) -> ApiResult<TokenResponse> {
    let id = id_of(user).ok_or_else(|| ApiError::Internal("user document without _id".to_string()))?;
    let token = state.jwt.generate_access_token(id, Role::of(user))?;
    Ok(TokenResponse::new(token, state.jwt.ttl_seconds()))
}

/// Register a `user` or `publisher` account
async fn register_handler(
    State(state): State<SharedState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    let Json(registration) = payload?;
    registration.validate(&state.password_policy, false)?;
    ensure_email_free(state.store.as_ref(), &registration.email, None)?;

    let doc = registration.into_document(&state.password_policy, false)?;
    let user = state.store.insert(USERS, doc)?;

    info!(
        id = id_of(&user).unwrap_or_default(),
        role = Role::of(&user).as_str(),
        "user registered"
    );
    Ok((StatusCode::CREATED, Json(issue_token(&state, &user)?)))
}

async fn login_handler(
    State(state): State<SharedState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(credentials) = payload?;
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Please provide an email and password".to_string(),
        ));
    }

    let user = state
        .store
        .find_one(USERS, &Predicate::eq("email", normalize_email(&credentials.email)))?
        .ok_or(AuthError::InvalidCredentials)?;
    let hash = user
        .get(PASSWORD_FIELD)
        .and_then(Value::as_str)
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(&credentials.password, hash)? {
        return Err(AuthError::InvalidCredentials.into());
    }

    Ok(Json(issue_token(&state, &user)?))
}

/// The caller's own user document
async fn me_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Json<Envelope<Value>>> {
    let principal = authenticate(&state, &headers)?;
    let user = state
        .store
        .find_by_id(USERS, &principal.user_id)?
        .ok_or(AuthError::AuthenticationRequired)?;
    Ok(Json(Envelope::single(public_view(user))))
}
