//! # Photo Uploads

pub mod errors;
pub mod local;

pub use errors::{UploadError, UploadResult};
pub use local::{IncomingFile, PhotoStore};
