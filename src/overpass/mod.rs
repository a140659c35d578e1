//! Facility query gateway backed by the Overpass API.

mod client;
mod query;
mod response;
mod survey;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::FacilityRecord;

pub use client::OverpassClient;
pub use query::{GeoFilterQuery, DEFAULT_QUERY_TIMEOUT_SECS};
pub use response::parse_elements;
pub use survey::{survey, CategorySurvey, SurveyReport};

/// Source of facility records for a category around a point.
///
/// Each call is independent: no caching, deduplication or retry.
#[async_trait]
pub trait FacilityGateway: Send + Sync {
    async fn fetch(&self, query: &GeoFilterQuery) -> Result<Vec<FacilityRecord>, FetchError>;
}
