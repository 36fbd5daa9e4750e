//! # Pagination
//!
//! Page windows and the `next`/`prev` links returned with list results.

use serde::Serialize;

/// Page number used when `page` is absent or not a positive integer
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when `limit` is absent or not a positive integer
pub const DEFAULT_LIMIT: u64 = 25;

/// Offset/limit pair selecting one page of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationWindow {
    pub offset: u64,
    pub limit: u64,
}

impl PaginationWindow {
    /// Window for a 1-based page
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(limit),
            limit,
        }
    }
}

/// Reference to a neighbouring page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

/// Links to the pages around the current one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaginationMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

impl PaginationMetadata {
    /// Derive links from the current page and the number of matching records
    pub fn derive(page: u64, window: PaginationWindow, total: u64) -> Self {
        let next = (window.offset.saturating_add(window.limit) < total).then(|| PageRef {
            page: page + 1,
            limit: window.limit,
        });
        let prev = (window.offset > 0).then(|| PageRef {
            page: page - 1,
            limit: window.limit,
        });
        Self { next, prev }
    }
}
