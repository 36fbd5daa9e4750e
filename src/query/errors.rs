//! # Query Errors
//!
//! Error types for query translation and radius search.

use thiserror::Error;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Query translation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Filter parameters could not be turned into a predicate
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Geocoder returned no candidates for the zipcode
    #[error("No location found for zipcode {0}")]
    LocationNotFound(String),

    /// Geocoder itself failed
    #[error("Geocoder error: {0}")]
    Geocoder(String),
}

impl QueryError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            QueryError::InvalidQuery(_) => 400,
            QueryError::LocationNotFound(_) => 404,
            QueryError::Geocoder(_) => 502,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(QueryError::InvalidQuery("x".into()).status_code(), 400);
        assert_eq!(QueryError::LocationNotFound("02118".into()).status_code(), 404);
        assert_eq!(QueryError::Geocoder("down".into()).status_code(), 502);
    }
}
