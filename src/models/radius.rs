//! Search radius derived from the user's radius multiplier.

use serde::{Deserialize, Serialize};

use crate::error::RadiusError;

/// One mile, the radius at multiplier 1.0
pub const BASE_RADIUS_METERS: f64 = 1609.34;

pub const MIN_MULTIPLIER: f64 = 0.5;
pub const MAX_MULTIPLIER: f64 = 2.0;
pub const MULTIPLIER_STEP: f64 = 0.5;

/// Radius multiplier in `0.5..=2.0`, on a 0.5 grid
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct RadiusMultiplier(f64);

impl RadiusMultiplier {
    pub const DEFAULT: RadiusMultiplier = RadiusMultiplier(1.0);

    pub fn new(value: f64) -> Result<Self, RadiusError> {
        if !(MIN_MULTIPLIER..=MAX_MULTIPLIER).contains(&value) {
            return Err(RadiusError::OutOfRange(value));
        }
        let steps = value / MULTIPLIER_STEP;
        if (steps - steps.round()).abs() > 1e-9 {
            return Err(RadiusError::OffStep(value));
        }
        Ok(Self(steps.round() * MULTIPLIER_STEP))
    }

    /// Slider semantics: clamp into range, then round to the nearest step.
    pub fn snapped(value: f64) -> Self {
        let value = if value.is_nan() { 1.0 } else { value };
        let clamped = value.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER);
        Self((clamped / MULTIPLIER_STEP).round() * MULTIPLIER_STEP)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Effective search radius in meters
    pub fn radius_meters(self) -> f64 {
        self.0 * BASE_RADIUS_METERS
    }
}

impl Default for RadiusMultiplier {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for RadiusMultiplier {
    type Error = RadiusError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RadiusMultiplier> for f64 {
    fn from(m: RadiusMultiplier) -> Self {
        m.0
    }
}
