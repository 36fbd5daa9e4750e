//! # HTTP API
//!
//! Axum routes for bootcamps, courses, reviews, auth and users under
//! `/api/v1`. Handlers share one [`AppState`] holding the store, the
//! geocoder, the token manager and the photo store.

pub mod advanced;
pub mod auth_routes;
pub mod bootcamps;
pub mod courses;
pub mod documents;
pub mod errors;
pub mod guard;
pub mod response;
pub mod reviews;
pub mod server;
pub mod users;

pub use advanced::{advanced_results, Populate};
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use response::Envelope;
pub use server::{ApiServer, AppState, SharedState};

/// Collection names
pub const BOOTCAMPS: &str = "bootcamps";
pub const COURSES: &str = "courses";
pub const REVIEWS: &str = "reviews";
pub const USERS: &str = "users";

/// Route prefix
pub const API_PREFIX: &str = "/api/v1";
