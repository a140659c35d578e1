//! Parsing of Overpass JSON responses into facility records.

use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::error::FetchError;
use crate::models::{Category, Coordinate, FacilityRecord};

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Parse a response body for `category`.
///
/// A body without an `elements` array is malformed; individual elements
/// without a full coordinate pair are skipped.
pub fn parse_elements(category: Category, body: &str) -> Result<Vec<FacilityRecord>, FetchError> {
    let response: OverpassResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

    let total = response.elements.len();
    let records: Vec<FacilityRecord> = response
        .elements
        .into_iter()
        .filter_map(|element| {
            let (lat, lon) = match (element.lat, element.lon) {
                (Some(lat), Some(lon)) => (lat, lon),
                _ => return None,
            };
            let mut tags = element.tags;
            Some(FacilityRecord {
                category,
                coordinate: Coordinate::new(lat, lon),
                osm_id: element.id,
                name: tags.remove("name"),
            })
        })
        .collect();

    if records.len() < total {
        debug!(
            "{}: skipped {} of {} elements without coordinates",
            category,
            total - records.len(),
            total
        );
    }

    Ok(records)
}
