//! # Geospatial Search
//!
//! Radius predicates around a geocoded zipcode.

pub mod geocoder;
pub mod radius;

pub use geocoder::{Coordinates, Geocoder, StaticGeocoder};
pub use radius::{build_radius_predicate, parse_distance, RadiusQuery, EARTH_RADIUS_MILES};
