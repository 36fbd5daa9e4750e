//! # Auth Module
//!
//! Password hashing, JWT access tokens, roles and ownership checks.

pub mod access;
pub mod crypto;
pub mod errors;
pub mod jwt;
pub mod user;

pub use access::{Principal, OWNER_FIELD};
pub use crypto::PasswordPolicy;
pub use errors::{AuthError, AuthResult};
pub use jwt::{JwtClaims, JwtConfig, JwtManager, TokenResponse};
pub use user::{Credentials, Registration, Role};
