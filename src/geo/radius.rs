//! # Radius Filter
//!
//! Converts a zipcode and a distance into a spherical-cap predicate.
//!
//! Distances are turned into angles with a mean Earth radius of 3963 miles.
//! This is a spherical approximation; results near the edge of the radius
//! can differ from ellipsoidal distance by up to ~0.5%.

use serde::Serialize;
use serde_json::{json, Value};

use super::geocoder::Geocoder;
use crate::query::errors::{QueryError, QueryResult};

/// Mean Earth radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// Centre and angular radius of a radius search
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RadiusQuery {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub radius_radians: f64,
}

impl RadiusQuery {
    pub fn new(center_latitude: f64, center_longitude: f64, distance_miles: f64) -> Self {
        Self {
            center_latitude,
            center_longitude,
            radius_radians: distance_miles / EARTH_RADIUS_MILES,
        }
    }

    /// Check whether a point lies within the cap (boundary included)
    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        central_angle(
            self.center_latitude,
            self.center_longitude,
            latitude,
            longitude,
        ) <= self.radius_radians
    }

    /// Store document form: `{"$geoWithin": {"$centerSphere": [[lng, lat], r]}}`
    pub fn to_document(&self) -> Value {
        json!({
            "$geoWithin": {
                "$centerSphere": [
                    [self.center_longitude, self.center_latitude],
                    self.radius_radians
                ]
            }
        })
    }
}

/// Great-circle angle between two points, in radians (haversine form)
fn central_angle(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Parse a distance path segment in miles
pub fn parse_distance(value: &str) -> QueryResult<f64> {
    let distance: f64 = value
        .trim()
        .parse()
        .map_err(|_| QueryError::InvalidQuery(format!("Invalid distance: {}", value)))?;

    if !distance.is_finite() || distance < 0.0 {
        return Err(QueryError::InvalidQuery(format!(
            "Distance must be a non-negative number: {}",
            value
        )));
    }
    Ok(distance)
}

/// Geocode `zipcode` once and build the radius around its first candidate
pub fn build_radius_predicate<G: Geocoder + ?Sized>(
    zipcode: &str,
    distance_miles: f64,
    geocoder: &G,
) -> QueryResult<RadiusQuery> {
    let candidates = geocoder.geocode(zipcode)?;
    let center = candidates
        .first()
        .ok_or_else(|| QueryError::LocationNotFound(zipcode.to_string()))?;

    Ok(RadiusQuery::new(center.latitude, center.longitude, distance_miles))
}
