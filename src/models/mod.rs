//! Core data models for facilities and markers.

pub mod category;
pub mod facility;
pub mod radius;

pub use category::{hex_rgb, Category, CategorySpec, MarkerStyle, TagSelector};
pub use facility::{Annotation, Coordinate, FacilityRecord};
pub use radius::{RadiusMultiplier, BASE_RADIUS_METERS};
