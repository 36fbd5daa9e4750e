//! # Access Control
//!
//! Role gates and ownership gates for mutating routes.
//!
//! Existence and ownership are checked separately by callers: a missing
//! document is reported before ownership is ever considered.

use serde_json::Value;

use super::errors::{AuthError, AuthResult};
use super::user::Role;

/// Field on owned documents holding the owner's user id
pub const OWNER_FIELD: &str = "user";

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Role gate
    pub fn authorize(&self, allowed: &[Role]) -> AuthResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AuthError::RoleNotAllowed(self.role.as_str().to_string()))
        }
    }

    /// Whether the document's owner field names this caller
    pub fn owns(&self, doc: &Value) -> bool {
        doc.get(OWNER_FIELD).and_then(Value::as_str) == Some(self.user_id.as_str())
    }

    /// Ownership gate; admins pass everything
    pub fn ensure_owner(&self, doc: &Value, action: &str) -> AuthResult<()> {
        if self.is_admin() || self.owns(doc) {
            Ok(())
        } else {
            Err(AuthError::NotOwner(self.user_id.clone(), action.to_string()))
        }
    }
}
