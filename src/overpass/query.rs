//! Overpass QL construction for a category around a point.

use serde::Serialize;
use std::fmt::Write;

use crate::models::{Category, Coordinate, RadiusMultiplier};

/// Default `[timeout:..]` directive, matching the client timeout
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 15;

/// A single category lookup around a center point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoFilterQuery {
    pub category: Category,
    pub center: Coordinate,
    pub radius_meters: f64,
}

impl GeoFilterQuery {
    pub fn new(category: Category, center: Coordinate, radius_meters: f64) -> Self {
        Self {
            category,
            center,
            radius_meters,
        }
    }

    pub fn with_multiplier(category: Category, center: Coordinate, multiplier: RadiusMultiplier) -> Self {
        Self::new(category, center, multiplier.radius_meters())
    }

    /// Render the Overpass QL text, unioning every selector of the category.
    pub fn to_overpass(&self, timeout_secs: u64) -> String {
        let around = format!(
            "(around:{:.2},{},{})",
            self.radius_meters, self.center.lat, self.center.lon
        );

        let mut ql = format!("[out:json][timeout:{}];(", timeout_secs);
        for selector in self.category.spec().selectors {
            ql.push_str("node");
            for (key, value) in selector.iter() {
                // write! into a String cannot fail
                let _ = write!(ql, "[\"{}\"=\"{}\"]", key, value);
            }
            ql.push_str(&around);
            ql.push(';');
        }
        ql.push_str(");out body;");
        ql
    }
}
