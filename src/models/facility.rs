//! Coordinates, fetched facility records and their on-map annotations.

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Category, MarkerStyle};

/// Geographic coordinate in degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and within latitude/longitude bounds
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// `geo` point (x = lon, y = lat)
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// Great-circle distance in meters
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        Haversine.distance(self.to_point(), other.to_point())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// A facility returned by the geodata service for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub category: Category,
    pub coordinate: Coordinate,
    /// OSM node id, when the service reported one
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub osm_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}

impl FacilityRecord {
    pub fn new(category: Category, coordinate: Coordinate) -> Self {
        Self {
            category,
            coordinate,
            osm_id: None,
            name: None,
        }
    }
}

/// A record as displayed on the map.
///
/// The style always comes from the record's category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    #[serde(flatten)]
    pub record: FacilityRecord,
    pub style: MarkerStyle,
}

impl Annotation {
    pub fn category(&self) -> Category {
        self.record.category
    }

    pub fn coordinate(&self) -> Coordinate {
        self.record.coordinate
    }

    /// Title shown in the marker callout
    pub fn title(&self) -> &str {
        self.record
            .name
            .as_deref()
            .unwrap_or_else(|| self.record.category.label())
    }
}

impl From<FacilityRecord> for Annotation {
    fn from(record: FacilityRecord) -> Self {
        let style = record.category.style();
        Self { record, style }
    }
}
