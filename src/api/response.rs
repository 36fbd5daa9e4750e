//! # Response Envelope
//!
//! Every success body is `{ success, count?, pagination?, data }`.

use serde::Serialize;
use serde_json::{json, Value};

use crate::query::PaginationMetadata;

#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMetadata>,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    /// Single document or scalar payload
    pub fn single(data: T) -> Self {
        Self {
            success: true,
            count: None,
            pagination: None,
            data,
        }
    }
}

impl<T: Serialize> Envelope<Vec<T>> {
    /// List without page links
    pub fn list(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: Some(data.len()),
            pagination: None,
            data,
        }
    }

    /// One page of an advanced-results query
    pub fn page(data: Vec<T>, pagination: PaginationMetadata) -> Self {
        Self {
            success: true,
            count: Some(data.len()),
            pagination: Some(pagination),
            data,
        }
    }
}

impl Envelope<Value> {
    /// Body returned after a delete
    pub fn empty() -> Self {
        Self::single(json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{PaginationWindow, PaginationMetadata};

    #[test]
    fn test_list_shape() {
        let body = serde_json::to_value(Envelope::list(vec![json!({"a": 1})])).unwrap();
        assert_eq!(body, json!({"success": true, "count": 1, "data": [{"a": 1}]}));
    }

    #[test]
    fn test_page_shape() {
        let meta = PaginationMetadata::derive(1, PaginationWindow::new(1, 25), 100);
        let body = serde_json::to_value(Envelope::page(Vec::<Value>::new(), meta)).unwrap();
        assert_eq!(
            body,
            json!({
                "success": true,
                "count": 0,
                "pagination": {"next": {"page": 2, "limit": 25}},
                "data": []
            })
        );
    }

    #[test]
    fn test_empty_shape() {
        let body = serde_json::to_value(Envelope::empty()).unwrap();
        assert_eq!(body, json!({"success": true, "data": {}}));
    }
}
