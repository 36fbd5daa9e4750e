//! # Query Translation
//!
//! Translates list-endpoint query strings into store query plans:
//! filter predicate, projection, sort order and pagination window.

pub mod errors;
pub mod filter;
pub mod pagination;
pub mod parser;

pub use errors::{QueryError, QueryResult};
pub use filter::{ComparisonOperator, FilterNode, Predicate};
pub use pagination::{PageRef, PaginationMetadata, PaginationWindow};
pub use parser::{translate, Projection, QueryPlan, SortDirection, SortKey};
