//! # Users
//!
//! Roles, registration validation and the user document layout.
//! Users are stored as documents in the `users` collection; the
//! `password` field holds an Argon2id hash and is never returned.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::crypto::{hash_password, PasswordPolicy};
use super::errors::{AuthError, AuthResult};

/// Field holding the password hash
pub const PASSWORD_FIELD: &str = "password";

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

/// User roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "publisher" => Some(Role::Publisher),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Role recorded on a user document (`user` when absent)
    pub fn of(doc: &Value) -> Self {
        doc.get("role")
            .and_then(Value::as_str)
            .and_then(Role::parse)
            .unwrap_or_default()
    }
}

/// Check an email address against a conservative pattern
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
                .expect("valid email regex")
        })
        .is_match(email)
}

/// Registration or admin-created user payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl Registration {
    /// Validate fields and resolve the role.
    ///
    /// `admin` is only accepted when `allow_admin` is set.
    pub fn validate(&self, policy: &PasswordPolicy, allow_admin: bool) -> AuthResult<Role> {
        if self.name.trim().is_empty() {
            return Err(AuthError::MissingField("name".to_string()));
        }
        if !is_valid_email(self.email.trim()) {
            return Err(AuthError::InvalidEmail);
        }
        policy.validate(&self.password)?;

        let role = match self.role.as_deref() {
            None => Role::User,
            Some(raw) => Role::parse(raw).ok_or_else(|| AuthError::InvalidRole(raw.to_string()))?,
        };
        if role == Role::Admin && !allow_admin {
            return Err(AuthError::InvalidRole(role.as_str().to_string()));
        }
        Ok(role)
    }

    /// Build the stored user document, hashing the password
    pub fn into_document(self, policy: &PasswordPolicy, allow_admin: bool) -> AuthResult<Value> {
        let role = self.validate(policy, allow_admin)?;
        Ok(json!({
            "name": self.name.trim(),
            "email": normalize_email(&self.email),
            "role": role,
            PASSWORD_FIELD: hash_password(&self.password)?,
        }))
    }
}

/// Login payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Emails are matched case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Strip the password hash from a user document
pub fn public_view(mut doc: Value) -> Value {
    if let Some(obj) = doc.as_object_mut() {
        obj.remove(PASSWORD_FIELD);
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::crypto::verify_password;

    fn registration(role: Option<&str>) -> Registration {
        Registration {
            name: "Jane Doe".to_string(),
            email: "Jane@Example.com".to_string(),
            password: "123456".to_string(),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("john@gmail.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("john@"));
        assert!(!is_valid_email("john.gmail.com"));
        assert!(!is_valid_email("john@gmail"));
    }

    #[test]
    fn test_role_resolution() {
        let policy = PasswordPolicy::default();
        assert_eq!(registration(None).validate(&policy, false).unwrap(), Role::User);
        assert_eq!(
            registration(Some("publisher")).validate(&policy, false).unwrap(),
            Role::Publisher
        );
        assert_eq!(
            registration(Some("admin")).validate(&policy, false),
            Err(AuthError::InvalidRole("admin".to_string()))
        );
        assert_eq!(
            registration(Some("admin")).validate(&policy, true).unwrap(),
            Role::Admin
        );
        assert!(matches!(
            registration(Some("root")).validate(&policy, true),
            Err(AuthError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_missing_name_and_short_password() {
        let policy = PasswordPolicy::default();
        let mut reg = registration(None);
        reg.name = "  ".to_string();
        assert_eq!(
            reg.validate(&policy, false),
            Err(AuthError::MissingField("name".to_string()))
        );

        let mut reg = registration(None);
        reg.password = "123".to_string();
        assert!(matches!(reg.validate(&policy, false), Err(AuthError::WeakPassword(_))));
    }

    #[test]
    fn test_document_hashes_password_and_normalizes_email() {
        let doc = registration(Some("publisher"))
            .into_document(&PasswordPolicy::default(), false)
            .unwrap();

        assert_eq!(doc["email"], "jane@example.com");
        assert_eq!(doc["role"], "publisher");
        let hash = doc[PASSWORD_FIELD].as_str().unwrap();
        assert_ne!(hash, "123456");
        assert!(verify_password("123456", hash).unwrap());

        let public = public_view(doc);
        assert!(public.get(PASSWORD_FIELD).is_none());
        assert_eq!(Role::of(&public), Role::Publisher);
    }

    #[test]
    fn test_role_of_defaults_to_user() {
        assert_eq!(Role::of(&json!({})), Role::User);
        assert_eq!(Role::of(&json!({"role": "wizard"})), Role::User);
    }
}
