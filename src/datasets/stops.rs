//! Transit stops and station connections for the stop detail sheet.

use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::read_json;
use crate::error::DatasetError;
use crate::models::Coordinate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// `None` when the dataset has no wheelchair information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheelchair: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<String>,
}

impl Stop {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

/// Undirected link between two stops
#[derive(Debug, Clone, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub route: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectedStop<'a> {
    pub stop: &'a Stop,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<&'a str>,
}

/// Everything the stop detail sheet shows
#[derive(Debug, Serialize)]
pub struct StopDetail<'a> {
    pub stop: &'a Stop,
    pub connections: Vec<ConnectedStop<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

type IndexedStop = GeomWithData<[f64; 2], usize>;

pub struct StopDirectory {
    stops: Vec<Stop>,
    by_id: HashMap<String, usize>,
    /// (neighbour index, route)
    adjacency: Vec<Vec<(usize, Option<String>)>>,
    tree: RTree<IndexedStop>,
}

impl StopDirectory {
    pub fn load(stops_path: &Path, connections_path: Option<&Path>) -> Result<Self, DatasetError> {
        let stops: Vec<Stop> = read_json(stops_path)?;
        let connections: Vec<Connection> = match connections_path {
            Some(path) => read_json(path)?,
            None => Vec::new(),
        };
        Self::build(stops, connections)
    }

    pub fn build(stops: Vec<Stop>, connections: Vec<Connection>) -> Result<Self, DatasetError> {
        let by_id: HashMap<String, usize> = stops
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        let mut adjacency = vec![Vec::new(); stops.len()];
        for connection in connections {
            let from = *by_id
                .get(&connection.from)
                .ok_or_else(|| DatasetError::UnknownStop(connection.from.clone()))?;
            let to = *by_id
                .get(&connection.to)
                .ok_or_else(|| DatasetError::UnknownStop(connection.to.clone()))?;
            if from == to {
                continue;
            }
            adjacency[from].push((to, connection.route.clone()));
            adjacency[to].push((from, connection.route));
        }

        let indexed: Vec<IndexedStop> = stops
            .iter()
            .enumerate()
            .map(|(i, s)| GeomWithData::new([s.lon, s.lat], i))
            .collect();
        let tree = RTree::bulk_load(indexed);

        info!(
            "Stop directory: {} stops, {} connections",
            stops.len(),
            adjacency.iter().map(Vec::len).sum::<usize>() / 2
        );

        Ok(Self {
            stops,
            by_id,
            adjacency,
            tree,
        })
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn stop(&self, id: &str) -> Option<&Stop> {
        self.by_id.get(id).map(|&i| &self.stops[i])
    }

    /// Up to `limit` stops closest to `center`, with distances in meters.
    ///
    /// Candidates come from the planar index; the result is ordered by
    /// great-circle distance.
    pub fn nearest(&self, center: Coordinate, limit: usize) -> Vec<(&Stop, f64)> {
        let mut found: Vec<(&Stop, f64)> = self
            .tree
            .nearest_neighbor_iter(&[center.lon, center.lat])
            .take(limit)
            .map(|entry| {
                let stop = &self.stops[entry.data];
                (stop, center.distance_to(&stop.coordinate()))
            })
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        found
    }

    pub fn detail(&self, id: &str, from: Option<Coordinate>) -> Option<StopDetail<'_>> {
        let index = *self.by_id.get(id)?;
        let stop = &self.stops[index];
        let connections = self.adjacency[index]
            .iter()
            .map(|(neighbour, route)| ConnectedStop {
                stop: &self.stops[*neighbour],
                route: route.as_deref(),
            })
            .collect();

        Some(StopDetail {
            stop,
            connections,
            distance_meters: from.map(|c| c.distance_to(&stop.coordinate())),
        })
    }
}
