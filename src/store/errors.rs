//! # Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::InvalidDocument(_) => 400,
            StoreError::DuplicateKey(_) => 400,
            StoreError::Internal(_) => 500,
        }
    }
}
