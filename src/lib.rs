//! campdir - bootcamp directory REST API
//!
//! Resource listing with filter/select/sort/paging query strings, radius
//! search around a zipcode, JWT authentication with role and ownership
//! checks, and photo uploads.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod geo;
pub mod query;
pub mod seed;
pub mod store;
pub mod uploads;
