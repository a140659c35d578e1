//! Precomputed facility cluster circles for the science view.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::read_json;
use crate::error::DatasetError;
use crate::models::{hex_rgb, Category, Coordinate};

/// Clusters at or below this radius are dropped when cleaning
pub const MIN_CLUSTER_RADIUS_METERS: f64 = 10.0;

/// Graph metrics of a cluster, as precomputed offline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreValues {
    pub average_degree: Option<f64>,
    pub clustering_coefficient: Option<f64>,
    pub radius: Option<f64>,
    pub diameter: Option<f64>,
    pub average_path_length: Option<f64>,
    pub density: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCircle {
    pub id: u32,
    pub center_coordinate_lat: f64,
    pub center_coordinate_lon: f64,
    /// Meters
    pub radius: f64,
    /// Normalised to [-1, 1]
    pub accessibility_score: f64,
    #[serde(default)]
    pub core_values: CoreValues,
}

impl ClusterCircle {
    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.center_coordinate_lat, self.center_coordinate_lon)
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        self.center().distance_to(point) <= self.radius
    }

    pub fn color(&self) -> u32 {
        score_color(self.accessibility_score)
    }

    pub fn hex_color(&self) -> String {
        hex_rgb(self.color())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RawCentroid {
    pub latitude: f64,
    pub longitude: f64,
}

/// Graph metrics exported with each raw cluster
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TopologyMetrics {
    pub average_degree: Option<f64>,
    pub diameter: Option<f64>,
    pub average_path_length: Option<f64>,
    pub density: Option<f64>,
    pub clustering_coefficient: Option<f64>,
}

/// A cluster as produced by community detection, before cleaning
#[derive(Debug, Clone, Deserialize)]
pub struct RawCluster {
    pub cluster_id: u32,
    pub centroid: RawCentroid,
    pub radius_meters: f64,
    #[serde(default)]
    pub member_coordinates: Vec<Coordinate>,
    #[serde(default)]
    pub feature_counts: BTreeMap<Category, usize>,
    #[serde(default)]
    pub topology_metrics: TopologyMetrics,
}

/// Turn raw clusters into display circles.
///
/// Drops clusters with a radius of at most [`MIN_CLUSTER_RADIUS_METERS`],
/// rounds the center to 6 places and the radius to 2, and scores the
/// remaining batch onto [-1, 1].
pub fn rescore(raw: Vec<RawCluster>) -> Vec<ClusterCircle> {
    let total = raw.len();
    let kept: Vec<RawCluster> = raw
        .into_iter()
        .filter(|c| c.radius_meters > MIN_CLUSTER_RADIUS_METERS)
        .collect();
    debug!("Rescoring {} of {} clusters", kept.len(), total);

    let raw_scores: Vec<f64> = kept
        .iter()
        .map(|c| scoring::raw_score(&c.member_coordinates, &c.feature_counts))
        .collect();
    let scores = scoring::normalize_scores(&raw_scores);

    kept.into_iter()
        .zip(scores)
        .map(|(cluster, accessibility_score)| {
            let center = Coordinate::new(
                scoring::round_to(cluster.centroid.latitude, 6),
                scoring::round_to(cluster.centroid.longitude, 6),
            );
            let topology = cluster.topology_metrics;
            let member_radius_km = cluster
                .member_coordinates
                .iter()
                .map(|m| center.distance_to(m) / 1000.0)
                .fold(0.0, f64::max);

            ClusterCircle {
                id: cluster.cluster_id,
                center_coordinate_lat: center.lat,
                center_coordinate_lon: center.lon,
                radius: scoring::round_to(cluster.radius_meters, 2),
                accessibility_score,
                core_values: CoreValues {
                    average_degree: topology.average_degree.map(|v| scoring::round_to(v, 2)),
                    clustering_coefficient: topology
                        .clustering_coefficient
                        .map(|v| scoring::round_to(v, 4)),
                    radius: Some(scoring::round_to(member_radius_km, 2)),
                    diameter: topology.diameter.map(|v| scoring::round_to(v, 2)),
                    average_path_length: topology
                        .average_path_length
                        .map(|v| scoring::round_to(v, 2)),
                    density: topology.density.map(|v| scoring::round_to(v, 4)),
                },
            }
        })
        .collect()
}

/// Red (-1) through yellow (0) to green (+1), as 0xRRGGBB.
pub fn score_color(score: f64) -> u32 {
    let s = if score.is_nan() { 0.0 } else { score.clamp(-1.0, 1.0) };
    let (red, green) = if s < 0.0 {
        (255.0, 255.0 * (1.0 + s))
    } else {
        (255.0 * (1.0 - s), 255.0)
    };
    ((red.round() as u32) << 16) | ((green.round() as u32) << 8)
}

pub struct ClusterCatalog {
    circles: Vec<ClusterCircle>,
}

impl ClusterCatalog {
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let circles: Vec<ClusterCircle> = read_json(path)?;
        info!("Loaded {} cluster circles from {}", circles.len(), path.display());
        Ok(Self::new(circles))
    }

    /// Load raw clusters and clean them with [`rescore`].
    pub fn rescore_file(path: &Path) -> Result<Self, DatasetError> {
        let raw: Vec<RawCluster> = read_json(path)?;
        let circles = rescore(raw);
        info!("Rescored {} cluster circles from {}", circles.len(), path.display());
        Ok(Self::new(circles))
    }

    pub fn new(circles: Vec<ClusterCircle>) -> Self {
        Self { circles }
    }

    pub fn circles(&self) -> &[ClusterCircle] {
        &self.circles
    }

    pub fn len(&self) -> usize {
        self.circles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circles.is_empty()
    }

    pub fn containing(&self, point: Coordinate) -> Vec<&ClusterCircle> {
        self.circles.iter().filter(|c| c.contains(&point)).collect()
    }

    pub fn best(&self) -> Option<&ClusterCircle> {
        self.circles
            .iter()
            .max_by(|a, b| a.accessibility_score.total_cmp(&b.accessibility_score))
    }
}

/// Accessibility score inputs computed from cluster members.
pub mod scoring {
    use std::collections::BTreeMap;

    use crate::models::{Category, Coordinate};

    pub fn round_to(value: f64, places: i32) -> f64 {
        let factor = 10f64.powi(places);
        (value * factor).round() / factor
    }

    /// Mean great-circle distance between all member pairs, in km
    pub fn mean_pairwise_km(members: &[Coordinate]) -> f64 {
        if members.len() < 2 {
            return 0.0;
        }
        let mut total = 0.0;
        let mut pairs = 0usize;
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                total += a.distance_to(b) / 1000.0;
                pairs += 1;
            }
        }
        total / pairs as f64
    }

    /// `1 / (1 + mean pairwise km)`; tighter clusters score higher
    pub fn proximity_factor(members: &[Coordinate]) -> f64 {
        1.0 / (1.0 + mean_pairwise_km(members))
    }

    /// Distinct facility kinds present divided by the total facility count
    pub fn diversity_index(counts: &BTreeMap<Category, usize>) -> f64 {
        let total: usize = counts.values().sum();
        if total == 0 {
            return 0.0;
        }
        let kinds = counts.values().filter(|&&n| n > 0).count();
        kinds as f64 / total as f64
    }

    pub fn raw_score(members: &[Coordinate], counts: &BTreeMap<Category, usize>) -> f64 {
        round_to(proximity_factor(members) + diversity_index(counts), 4)
    }

    /// Z-score the raw scores, then stretch them min-max onto [-1, 1].
    ///
    /// Identical inputs all map to 0.
    pub fn normalize_scores(raw: &[f64]) -> Vec<f64> {
        if raw.is_empty() {
            return Vec::new();
        }
        let n = raw.len() as f64;
        let mean = raw.iter().sum::<f64>() / n;
        let std_dev = if raw.len() > 1 {
            (raw.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
        } else {
            0.0
        };

        let z: Vec<f64> = raw
            .iter()
            .map(|x| if std_dev > 0.0 { (x - mean) / std_dev } else { 0.0 })
            .collect();
        let min = z.iter().copied().fold(f64::INFINITY, f64::min);
        let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        z.iter()
            .map(|v| {
                if max > min {
                    round_to(2.0 * (v - min) / (max - min) - 1.0, 4)
                } else {
                    0.0
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::scoring::*;
    use super::*;

    fn circle(id: u32, score: f64) -> ClusterCircle {
        ClusterCircle {
            id,
            center_coordinate_lat: 37.7749,
            center_coordinate_lon: -122.4194,
            radius: 500.0,
            accessibility_score: score,
            core_values: CoreValues::default(),
        }
    }

    #[test]
    fn test_score_color_ends() {
        assert_eq!(score_color(-1.0), 0xFF0000);
        assert_eq!(score_color(0.0), 0xFFFF00);
        assert_eq!(score_color(1.0), 0x00FF00);
        assert_eq!(score_color(7.0), 0x00FF00);
    }

    #[test]
    fn test_containing() {
        let catalog = ClusterCatalog::new(vec![circle(1, 0.2)]);
        assert_eq!(catalog.containing(Coordinate::new(37.7760, -122.4194)).len(), 1);
        assert!(catalog.containing(Coordinate::new(37.8000, -122.4194)).is_empty());
    }

    #[test]
    fn test_best() {
        let catalog = ClusterCatalog::new(vec![circle(1, -0.3), circle(2, 0.9), circle(3, 0.1)]);
        assert_eq!(catalog.best().unwrap().id, 2);
    }

    #[test]
    fn test_normalize_bounds() {
        let scores = normalize_scores(&[1.2, 1.5, 1.9, 1.3]);
        assert_eq!(scores.len(), 4);
        assert_eq!(scores[0], -1.0);
        assert_eq!(scores[2], 1.0);
        assert!(scores.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_normalize_identical_is_zero() {
        assert_eq!(normalize_scores(&[0.7, 0.7, 0.7]), vec![0.0, 0.0, 0.0]);
        assert_eq!(normalize_scores(&[0.4]), vec![0.0]);
        assert!(normalize_scores(&[]).is_empty());
    }

    #[test]
    fn test_diversity_index() {
        let mut counts = BTreeMap::new();
        counts.insert(Category::Ramps, 3);
        counts.insert(Category::Elevators, 1);
        counts.insert(Category::HearingLoops, 0);
        assert_eq!(diversity_index(&counts), 0.5);
        assert_eq!(diversity_index(&BTreeMap::new()), 0.0);
    }

    #[test]
    fn test_proximity_factor() {
        assert_eq!(proximity_factor(&[Coordinate::new(1.0, 1.0)]), 1.0);
        let spread = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.009)];
        let factor = proximity_factor(&spread);
        assert!(factor > 0.49 && factor < 0.51, "got {factor}");
    }

    #[test]
    fn test_raw_score() {
        let mut counts = BTreeMap::new();
        counts.insert(Category::Ramps, 1);
        counts.insert(Category::Elevators, 1);
        // one member: proximity 1.0, two kinds over two features: 1.0
        assert_eq!(raw_score(&[Coordinate::new(1.0, 1.0)], &counts), 2.0);
        assert_eq!(raw_score(&[], &BTreeMap::new()), 1.0);
    }

    fn raw(id: u32, radius_meters: f64, members: Vec<Coordinate>, ramps: usize) -> RawCluster {
        let mut feature_counts = BTreeMap::new();
        feature_counts.insert(Category::Ramps, ramps);
        feature_counts.insert(Category::Elevators, 1);
        RawCluster {
            cluster_id: id,
            centroid: RawCentroid {
                latitude: 37.123456789,
                longitude: -122.987654321,
            },
            radius_meters,
            member_coordinates: members,
            feature_counts,
            topology_metrics: TopologyMetrics {
                density: Some(0.123456),
                ..TopologyMetrics::default()
            },
        }
    }

    #[test]
    fn test_rescore_pipeline() {
        let tight = vec![Coordinate::new(37.1234, -122.9876), Coordinate::new(37.1235, -122.9877)];
        let loose = vec![Coordinate::new(37.10, -122.95), Coordinate::new(37.15, -123.02)];
        let circles = rescore(vec![
            raw(1, 412.3456, tight, 1),
            raw(2, 10.0, Vec::new(), 1),
            raw(3, 2500.0, loose.clone(), 9),
            raw(4, 900.0, loose, 3),
        ]);

        let ids: Vec<u32> = circles.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);

        let first = &circles[0];
        assert_eq!(first.center_coordinate_lat, 37.123457);
        assert_eq!(first.center_coordinate_lon, -122.987654);
        assert_eq!(first.radius, 412.35);
        assert_eq!(first.core_values.density, Some(0.1235));
        assert!(first.core_values.radius.is_some());

        assert_eq!(first.accessibility_score, 1.0);
        assert_eq!(circles[1].accessibility_score, -1.0);
        assert!(circles
            .iter()
            .all(|c| (-1.0..=1.0).contains(&c.accessibility_score)));
    }

    #[test]
    fn test_rescore_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster_data.json");
        std::fs::write(
            &path,
            r#"[
                {"cluster_id": 1, "centroid": {"latitude": 37.77, "longitude": -122.41},
                 "radius_meters": 350.0,
                 "member_coordinates": [{"lat": 37.771, "lon": -122.411}],
                 "feature_counts": {"ramps": 2, "hearing_loops": 0},
                 "topology_metrics": {"diameter": 3, "average_path_length": 1.6667}},
                {"cluster_id": 2, "centroid": {"latitude": 37.78, "longitude": -122.42},
                 "radius_meters": 4.5}
            ]"#,
        )
        .unwrap();

        let catalog = ClusterCatalog::rescore_file(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        let c = &catalog.circles()[0];
        assert_eq!(c.accessibility_score, 0.0);
        assert_eq!(c.core_values.diameter, Some(3.0));
        assert_eq!(c.core_values.average_path_length, Some(1.67));
        assert_eq!(c.hex_color(), "#FFFF00");
    }

    #[test]
    fn test_load_cleaned_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned_data.json");
        std::fs::write(
            &path,
            r#"[{
                "core_values": {"average_degree": 4.2, "clustering_coefficient": 0.41, "radius": 512.3},
                "id": 7,
                "center_coordinate_lat": 37.774929,
                "center_coordinate_lon": -122.419416,
                "radius": 512.34,
                "accessibility_score": -0.1234
            }]"#,
        )
        .unwrap();

        let catalog = ClusterCatalog::load(&path).unwrap();
        let c = &catalog.circles()[0];
        assert_eq!(c.id, 7);
        assert_eq!(c.core_values.average_degree, Some(4.2));
        assert_eq!(c.core_values.density, None);
        assert_eq!(c.center(), Coordinate::new(37.774929, -122.419416));
    }
}
