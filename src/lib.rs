//! Accessmap - accessibility facility markers from OpenStreetMap
//!
//! This library provides the query gateway, marker state and bundled
//! datasets used by the `accessmap` binary.

pub mod config;
pub mod datasets;
pub mod error;
pub mod location;
pub mod markers;
pub mod models;
pub mod overpass;

pub use error::{FetchError, LocationError};
pub use markers::{MarkerSetManager, MarkerSnapshot};
pub use models::{Annotation, Category, Coordinate, FacilityRecord, RadiusMultiplier};
pub use overpass::{FacilityGateway, GeoFilterQuery, OverpassClient};
