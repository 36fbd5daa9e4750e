//! # Auth Errors
//!
//! Error types for the authentication module.

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    // ==================
    // Authentication Errors
    // ==================
    /// Unknown email or wrong password (generic - don't leak which)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Email already registered
    #[error("Email already registered")]
    EmailAlreadyExists,

    /// Email is not a plausible address
    #[error("Please add a valid email")]
    InvalidEmail,

    /// Password does not meet requirements
    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    /// Required registration field missing
    #[error("Please add a {0}")]
    MissingField(String),

    /// Role cannot be self-assigned
    #[error("Role `{0}` cannot be assigned at registration")]
    InvalidRole(String),

    // ==================
    // JWT Errors
    // ==================
    /// JWT token is malformed
    #[error("Malformed token")]
    MalformedToken,

    /// JWT token has expired
    #[error("Token expired")]
    TokenExpired,

    /// JWT signature is invalid
    #[error("Invalid token signature")]
    InvalidSignature,

    // ==================
    // Access Errors
    // ==================
    /// No token, or the token's user no longer exists
    #[error("Not authorized to access this route")]
    AuthenticationRequired,

    /// Role is not allowed on this route
    #[error("User role {0} is not authorized to access this route")]
    RoleNotAllowed(String),

    /// Caller neither owns the resource nor is an admin
    #[error("User {0} is not authorized to {1}")]
    NotOwner(String, String),

    // ==================
    // Internal Errors
    // ==================
    /// Password hashing failed
    #[error("Internal error: password hashing failed")]
    HashingFailed,

    /// Token generation failed
    #[error("Internal error: token generation failed")]
    TokenGenerationFailed,
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            AuthError::EmailAlreadyExists => 400,
            AuthError::InvalidEmail => 400,
            AuthError::WeakPassword(_) => 400,
            AuthError::MissingField(_) => 400,
            AuthError::InvalidRole(_) => 400,

            // 401 Unauthorized
            AuthError::InvalidCredentials => 401,
            AuthError::MalformedToken => 401,
            AuthError::TokenExpired => 401,
            AuthError::InvalidSignature => 401,
            AuthError::AuthenticationRequired => 401,

            // 403 Forbidden
            AuthError::RoleNotAllowed(_) => 403,
            AuthError::NotOwner(_, _) => 403,

            // 500 Internal Server Error
            AuthError::HashingFailed => 500,
            AuthError::TokenGenerationFailed => 500,
        }
    }
}
