//! # Upload Errors

use thiserror::Error;

/// Result type for upload operations
pub type UploadResult<T> = Result<T, UploadError>;

/// Photo upload errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadError {
    #[error("Please upload a file")]
    MissingFile,

    #[error("Please upload an image file")]
    NotAnImage(String),

    #[error("Please upload an image less than {1} bytes (got {0})")]
    FileTooLarge(u64, u64),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Problem with file upload: {0}")]
    IoError(String),
}

impl UploadError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            UploadError::MissingFile => 400,
            UploadError::NotAnImage(_) => 400,
            UploadError::FileTooLarge(_, _) => 413,
            UploadError::InvalidName(_) => 400,
            UploadError::IoError(_) => 500,
        }
    }
}
