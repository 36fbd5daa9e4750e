//! # Route Guards
//!
//! Bearer-token authentication and role gates.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::auth::{AuthError, Principal, Role};

use super::errors::ApiResult;
use super::server::AppState;
use super::USERS;

/// Resolve the caller from `Authorization: Bearer <token>`.
///
/// The role is read from the stored user, so role changes apply to
/// tokens issued earlier. A token whose user was deleted is rejected.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<Principal> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::AuthenticationRequired)?;

    let claims = state.jwt.validate_token(token)?;
    let user = state
        .store
        .find_by_id(USERS, &claims.sub)?
        .ok_or(AuthError::AuthenticationRequired)?;

    Ok(Principal::new(claims.sub, Role::of(&user)))
}

/// Authenticate and require one of `roles`
pub fn require_role(state: &AppState, headers: &HeaderMap, roles: &[Role]) -> ApiResult<Principal> {
    let principal = authenticate(state, headers)?;
    principal.authorize(roles)?;
    Ok(principal)
}
