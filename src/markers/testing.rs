//! Gateway doubles shared by the marker tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::FetchError;
use crate::models::{Category, Coordinate, FacilityRecord};
use crate::overpass::{FacilityGateway, GeoFilterQuery};

pub(crate) fn records(category: Category, n: usize) -> Vec<FacilityRecord> {
    (0..n)
        .map(|i| FacilityRecord::new(category, Coordinate::new(52.5 + i as f64 * 0.001, 13.4)))
        .collect()
}

/// Canned responses per category; unknown categories yield nothing.
#[derive(Default)]
pub(crate) struct StubGateway {
    responses: Mutex<HashMap<Category, Result<Vec<FacilityRecord>, FetchError>>>,
    pub(crate) queries: Mutex<Vec<GeoFilterQuery>>,
    gates: Mutex<HashMap<Category, Arc<Notify>>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub(crate) peak_in_flight: AtomicUsize,
}

impl StubGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn respond(&self, category: Category, result: Result<Vec<FacilityRecord>, FetchError>) {
        self.responses.lock().unwrap().insert(category, result);
    }

    /// Hold fetches for `category` until the returned gate is notified.
    pub(crate) fn gate(&self, category: Category) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(category, Arc::clone(&gate));
        gate
    }

    pub(crate) fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl FacilityGateway for StubGateway {
    async fn fetch(&self, query: &GeoFilterQuery) -> Result<Vec<FacilityRecord>, FetchError> {
        self.queries.lock().unwrap().push(*query);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let gate = self.gates.lock().unwrap().get(&query.category).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get(&query.category)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Never answers
pub(crate) struct SilentGateway;

#[async_trait]
impl FacilityGateway for SilentGateway {
    async fn fetch(&self, _query: &GeoFilterQuery) -> Result<Vec<FacilityRecord>, FetchError> {
        std::future::pending().await
    }
}
