//! One-shot survey of every category around a point.
//!
//! Produces a JSON report keyed by category for offline analysis of the
//! facility network.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{info, warn};

use super::{FacilityGateway, GeoFilterQuery};
use crate::models::{Category, Coordinate, FacilityRecord};

/// Result for one category in a survey
#[derive(Debug, Serialize)]
pub struct CategorySurvey {
    pub elements: Vec<FacilityRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SurveyReport {
    pub center: Coordinate,
    pub radius_meters: f64,
    pub collected_at: DateTime<Utc>,
    /// Keyed by category key (`ramps`, `hearing_loops`, ...)
    pub categories: BTreeMap<String, CategorySurvey>,
}

impl SurveyReport {
    pub fn total_elements(&self) -> usize {
        self.categories.values().map(|c| c.elements.len()).sum()
    }

    pub fn failed_categories(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .filter(|(_, c)| c.error.is_some())
            .map(|(k, _)| k.as_str())
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        info!("Survey written to {}", path.display());
        Ok(())
    }
}

/// Fetch every category at `center`, at most `concurrency` at a time.
pub async fn survey<G>(
    gateway: &G,
    center: Coordinate,
    radius_meters: f64,
    concurrency: usize,
) -> SurveyReport
where
    G: FacilityGateway + ?Sized,
{
    info!(
        "Surveying {} categories around {} within {:.0}m",
        Category::ALL.len(),
        center,
        radius_meters
    );

    let results: Vec<(Category, _)> = stream::iter(Category::ALL)
        .map(move |category| async move {
            let query = GeoFilterQuery::new(category, center, radius_meters);
            (category, gateway.fetch(&query).await)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut categories = BTreeMap::new();
    for (category, result) in results {
        let entry = match result {
            Ok(elements) => CategorySurvey {
                elements,
                error: None,
            },
            Err(e) => {
                warn!("Survey of {} failed: {}", category, e);
                CategorySurvey {
                    elements: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        categories.insert(category.key().to_string(), entry);
    }

    SurveyReport {
        center,
        radius_meters,
        collected_at: Utc::now(),
        categories,
    }
}
