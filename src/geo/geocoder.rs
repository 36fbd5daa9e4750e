//! # Geocoder
//!
//! Zipcode → coordinate lookup used by radius search. Providers implement
//! [`Geocoder`]; [`StaticGeocoder`] serves a fixed table.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::query::errors::{QueryError, QueryResult};

/// A geocoding candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Zipcode lookup capability
pub trait Geocoder: Send + Sync {
    /// Candidates for a zipcode, best first. An empty list means no match.
    fn geocode(&self, zipcode: &str) -> QueryResult<Vec<Coordinates>>;
}

/// Geocoder backed by an in-memory zipcode table
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    table: HashMap<String, Coordinates>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, zipcode: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        self.table
            .insert(zipcode.into(), Coordinates { latitude, longitude });
        self
    }

    /// Load a table of the form `{"02118": {"latitude": .., "longitude": ..}}`
    pub fn load(path: &Path) -> QueryResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            QueryError::Geocoder(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let table: HashMap<String, Coordinates> = serde_json::from_str(&content).map_err(|e| {
            QueryError::Geocoder(format!("Invalid geocode table {}: {}", path.display(), e))
        })?;
        Ok(Self { table })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Geocoder for StaticGeocoder {
    fn geocode(&self, zipcode: &str) -> QueryResult<Vec<Coordinates>> {
        Ok(self.table.get(zipcode.trim()).copied().into_iter().collect())
    }
}
