//! Displayed marker state, one entry per active category.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Annotation, Category};

/// Lifecycle of one category on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CategoryState {
    Inactive,
    Fetching,
    Populated {
        count: usize,
        fetched_at: DateTime<Utc>,
    },
    /// Last fetch failed; `retained` markers from an earlier fetch stay visible
    FetchFailed { reason: String, retained: usize },
}

#[derive(Debug)]
struct CategoryEntry {
    state: CategoryState,
    annotations: Vec<Annotation>,
}

impl Default for CategoryEntry {
    fn default() -> Self {
        Self {
            state: CategoryState::Fetching,
            annotations: Vec::new(),
        }
    }
}

/// Annotations keyed by category.
///
/// Categories absent from the map are inactive and have no annotations.
#[derive(Debug, Default)]
pub struct MarkerSet {
    entries: BTreeMap<Category, CategoryEntry>,
    status: String,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, category: Category) -> CategoryState {
        self.entries
            .get(&category)
            .map(|e| e.state.clone())
            .unwrap_or(CategoryState::Inactive)
    }

    pub fn is_active(&self, category: Category) -> bool {
        self.entries.contains_key(&category)
    }

    pub fn active_categories(&self) -> Vec<Category> {
        self.entries.keys().copied().collect()
    }

    /// Mark a category as loading, keeping whatever it already shows.
    pub fn begin_fetch(&mut self, category: Category) {
        self.entries.entry(category).or_default().state = CategoryState::Fetching;
    }

    /// Swap in a fresh annotation list for one category.
    pub fn replace(&mut self, category: Category, annotations: Vec<Annotation>) {
        let entry = self.entries.entry(category).or_default();
        entry.state = CategoryState::Populated {
            count: annotations.len(),
            fetched_at: Utc::now(),
        };
        entry.annotations = annotations;
    }

    pub fn fail(&mut self, category: Category, reason: String) {
        let entry = self.entries.entry(category).or_default();
        entry.state = CategoryState::FetchFailed {
            reason,
            retained: entry.annotations.len(),
        };
    }

    /// Drop a category entirely; returns how many annotations it had.
    pub fn remove(&mut self, category: Category) -> usize {
        self.entries
            .remove(&category)
            .map(|e| e.annotations.len())
            .unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn annotations(&self, category: Category) -> &[Annotation] {
        self.entries
            .get(&category)
            .map(|e| e.annotations.as_slice())
            .unwrap_or(&[])
    }

    /// All annotations, in category order
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.entries.values().flat_map(|e| e.annotations.iter())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|e| e.annotations.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn snapshot(&self) -> MarkerSnapshot {
        MarkerSnapshot {
            status: self.status.clone(),
            taken_at: Utc::now(),
            categories: self
                .entries
                .iter()
                .map(|(category, entry)| CategorySnapshot {
                    category: *category,
                    label: category.label(),
                    state: entry.state.clone(),
                    count: entry.annotations.len(),
                })
                .collect(),
            annotations: self.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySnapshot {
    pub category: Category,
    pub label: &'static str,
    #[serde(flatten)]
    pub state: CategoryState,
    pub count: usize,
}

/// Read-only copy of the marker set for presentation
#[derive(Debug, Clone, Serialize)]
pub struct MarkerSnapshot {
    pub status: String,
    pub taken_at: DateTime<Utc>,
    pub categories: Vec<CategorySnapshot>,
    pub annotations: Vec<Annotation>,
}

impl MarkerSnapshot {
    pub fn category(&self, category: Category) -> Option<&CategorySnapshot> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn count(&self, category: Category) -> usize {
        self.annotations
            .iter()
            .filter(|a| a.category() == category)
            .count()
    }
}

impl Default for MarkerSnapshot {
    fn default() -> Self {
        MarkerSet::new().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, FacilityRecord};

    fn annotations(category: Category, n: usize) -> Vec<Annotation> {
        (0..n)
            .map(|i| FacilityRecord::new(category, Coordinate::new(i as f64, 0.0)).into())
            .collect()
    }

    #[test]
    fn test_inactive_by_default() {
        let set = MarkerSet::new();
        assert_eq!(set.state(Category::Ramps), CategoryState::Inactive);
        assert!(set.annotations(Category::Ramps).is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn test_replace_does_not_touch_other_categories() {
        let mut set = MarkerSet::new();
        set.replace(Category::Ramps, annotations(Category::Ramps, 3));
        set.replace(Category::Elevators, annotations(Category::Elevators, 2));
        set.replace(Category::Ramps, annotations(Category::Ramps, 1));

        assert_eq!(set.annotations(Category::Ramps).len(), 1);
        assert_eq!(set.annotations(Category::Elevators).len(), 2);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_fail_retains_previous() {
        let mut set = MarkerSet::new();
        set.replace(Category::Ramps, annotations(Category::Ramps, 2));
        set.begin_fetch(Category::Ramps);
        set.fail(Category::Ramps, "network error: reset".into());

        assert_eq!(
            set.state(Category::Ramps),
            CategoryState::FetchFailed {
                reason: "network error: reset".into(),
                retained: 2
            }
        );
        assert_eq!(set.annotations(Category::Ramps).len(), 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut set = MarkerSet::new();
        set.replace(Category::Ramps, annotations(Category::Ramps, 2));
        assert_eq!(set.remove(Category::Ramps), 2);
        assert_eq!(set.remove(Category::Ramps), 0);
        assert!(!set.is_active(Category::Ramps));
    }

    #[test]
    fn test_snapshot_serializes_state() {
        let mut set = MarkerSet::new();
        set.begin_fetch(Category::HearingLoops);
        set.set_status("Loading Hearing Loops");

        let snapshot = set.snapshot();
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["status"], "Loading Hearing Loops");
        assert_eq!(value["categories"][0]["category"], "hearing_loops");
        assert_eq!(value["categories"][0]["state"], "fetching");
        assert_eq!(value["categories"][0]["count"], 0);
    }
}
