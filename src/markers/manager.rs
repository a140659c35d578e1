//! Marker set manager: turns category toggles and view changes into
//! gateway fetches and applies their results.
//!
//! All state lives on the owning task. Fetches run as spawned tasks and
//! report back over a channel; the owner applies them with [`MarkerSetManager::apply`].
//! Each category has at most one fetch in flight, identified by a ticket, so a
//! late completion from a cancelled or superseded fetch is discarded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::set::{MarkerSet, MarkerSnapshot};
use crate::config::Config;
use crate::error::FetchError;
use crate::models::{Annotation, Category, Coordinate, FacilityRecord, RadiusMultiplier};
use crate::overpass::{FacilityGateway, GeoFilterQuery};

#[derive(Debug, Clone, Copy)]
pub struct ManagerSettings {
    pub fetch_timeout: Duration,
    /// Cap on concurrent gateway calls
    pub max_in_flight: usize,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
            max_in_flight: Category::ALL.len(),
        }
    }
}

impl From<&Config> for ManagerSettings {
    fn from(config: &Config) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.overpass.timeout_secs),
            max_in_flight: config.refresh.max_in_flight,
        }
    }
}

/// Map center and radius the queries are built from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Coordinate,
    pub multiplier: RadiusMultiplier,
}

impl Viewport {
    pub fn new(center: Coordinate, multiplier: RadiusMultiplier) -> Self {
        Self { center, multiplier }
    }

    pub fn query(&self, category: Category) -> GeoFilterQuery {
        GeoFilterQuery::with_multiplier(category, self.center, self.multiplier)
    }
}

/// Outcome of one spawned fetch
#[derive(Debug)]
pub struct FetchCompletion {
    pub category: Category,
    ticket: u64,
    pub result: Result<Vec<FacilityRecord>, FetchError>,
}

struct InFlight {
    ticket: u64,
    handle: JoinHandle<()>,
}

pub struct MarkerSetManager<G: FacilityGateway + ?Sized + 'static> {
    gateway: Arc<G>,
    settings: ManagerSettings,
    viewport: Viewport,
    markers: MarkerSet,
    in_flight: HashMap<Category, InFlight>,
    next_ticket: u64,
    permits: Arc<Semaphore>,
    completions_tx: mpsc::UnboundedSender<FetchCompletion>,
    completions_rx: mpsc::UnboundedReceiver<FetchCompletion>,
}

impl<G: FacilityGateway + ?Sized + 'static> MarkerSetManager<G> {
    pub fn new(gateway: Arc<G>, viewport: Viewport, settings: ManagerSettings) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            gateway,
            settings,
            viewport,
            markers: MarkerSet::new(),
            in_flight: HashMap::new(),
            next_ticket: 0,
            permits: Arc::new(Semaphore::new(settings.max_in_flight.max(1))),
            completions_tx,
            completions_rx,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn status(&self) -> &str {
        self.markers.status()
    }

    pub fn snapshot(&self) -> MarkerSnapshot {
        self.markers.snapshot()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Start (or restart) the fetch for `category` at the current viewport.
    pub fn activate(&mut self, category: Category) {
        self.cancel(category);

        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let query = self.viewport.query(category);
        let gateway = Arc::clone(&self.gateway);
        let permits = Arc::clone(&self.permits);
        let tx = self.completions_tx.clone();
        let timeout = self.settings.fetch_timeout;

        let handle = tokio::spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => match tokio::time::timeout(timeout, gateway.fetch(&query)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(timeout)),
                },
                Err(_) => return,
            };
            // Receiver gone means the manager was dropped
            let _ = tx.send(FetchCompletion {
                category,
                ticket,
                result,
            });
        });

        self.in_flight.insert(category, InFlight { ticket, handle });
        self.markers.begin_fetch(category);
        self.markers.set_status(format!("Loading {}", category.label()));
        debug!("Fetch #{} started for {}", ticket, category);
    }

    /// Hide `category`: cancel its fetch and drop its markers.
    pub fn deactivate(&mut self, category: Category) {
        self.cancel(category);
        if !self.markers.is_active(category) {
            return;
        }
        let removed = self.markers.remove(category);
        self.markers.set_status(format!("{} hidden", category.label()));
        info!("Deactivated {} ({} markers removed)", category, removed);
    }

    /// Re-fetch every active category; returns how many were started.
    pub fn refresh_all(&mut self) -> usize {
        let active = self.markers.active_categories();
        for category in &active {
            self.activate(*category);
        }
        if !active.is_empty() {
            info!("Refreshing {} categories around {}", active.len(), self.viewport.center);
        }
        active.len()
    }

    pub fn set_radius_multiplier(&mut self, multiplier: RadiusMultiplier) -> usize {
        self.viewport.multiplier = multiplier;
        self.refresh_all()
    }

    pub fn recenter(&mut self, center: Coordinate) -> usize {
        self.viewport.center = center;
        self.refresh_all()
    }

    /// Cancel everything and clear the map.
    pub fn teardown(&mut self) {
        for (_, fetch) in self.in_flight.drain() {
            fetch.handle.abort();
        }
        self.markers.clear();
        self.markers.set_status("Cleared");
    }

    /// Wait for the next fetch to finish. `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<FetchCompletion> {
        if self.in_flight.is_empty() {
            return None;
        }
        self.completions_rx.recv().await
    }

    /// Apply a completion if it is still current; returns whether it was applied.
    pub fn apply(&mut self, completion: FetchCompletion) -> bool {
        let category = completion.category;
        match self.in_flight.get(&category) {
            Some(fetch) if fetch.ticket == completion.ticket => {}
            _ => {
                debug!("Discarding stale fetch #{} for {}", completion.ticket, category);
                return false;
            }
        }
        self.in_flight.remove(&category);

        match completion.result {
            Ok(records) => {
                let annotations: Vec<Annotation> =
                    records.into_iter().map(Annotation::from).collect();
                let count = annotations.len();
                self.markers.replace(category, annotations);
                self.markers
                    .set_status(format!("Found {} {}", count, category.label()));
                info!("{}: {} markers", category, count);
            }
            Err(e) => {
                warn!("Fetch for {} failed: {}", category, e);
                self.markers
                    .set_status(format!("Failed to load {}: {}", category.label(), e));
                self.markers.fail(category, e.to_string());
            }
        }
        true
    }

    /// Apply completions until nothing is in flight.
    pub async fn settle(&mut self) {
        while let Some(completion) = self.next_completion().await {
            self.apply(completion);
        }
    }

    fn cancel(&mut self, category: Category) {
        if let Some(fetch) = self.in_flight.remove(&category) {
            fetch.handle.abort();
            debug!("Cancelled fetch #{} for {}", fetch.ticket, category);
        }
    }
}

impl<G: FacilityGateway + ?Sized + 'static> Drop for MarkerSetManager<G> {
    fn drop(&mut self) {
        for fetch in self.in_flight.values() {
            fetch.handle.abort();
        }
    }
}
