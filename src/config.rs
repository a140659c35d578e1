use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::location::Backoff;
use crate::models::{Coordinate, RadiusMultiplier};
use crate::overpass::DEFAULT_QUERY_TIMEOUT_SECS;

pub const DEFAULT_OVERPASS_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub overpass: OverpassConfig,
    pub refresh: RefreshConfig,
    pub view: ViewConfig,
    pub location: LocationConfig,
    pub datasets: DatasetsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OverpassConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OVERPASS_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            user_agent: concat!("accessmap/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefreshConfig {
    /// Periodic refresh of all active categories
    pub interval_secs: u64,
    /// Upper bound on concurrent fetches
    pub max_in_flight: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 600,
            max_in_flight: 12,
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewConfig {
    /// Center used until (or unless) a device location arrives
    pub default_center: Coordinate,
    pub radius_multiplier: RadiusMultiplier,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_center: Coordinate::new(37.7749, -122.4194),
            radius_multiplier: RadiusMultiplier::DEFAULT,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LocationConfig {
    pub poll_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            poll_attempts: 8,
            initial_backoff_ms: 250,
            max_backoff_ms: 5000,
        }
    }
}

impl LocationConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            initial: Duration::from_millis(self.initial_backoff_ms),
            max: Duration::from_millis(self.max_backoff_ms),
            attempts: self.poll_attempts,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DatasetsConfig {
    pub stops: Option<PathBuf>,
    pub connections: Option<PathBuf>,
    pub clusters: Option<PathBuf>,
}

impl OverpassConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Zero("overpass.timeout_secs"));
        }
        Ok(())
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.overpass.validate()?;
        if self.refresh.max_in_flight == 0 {
            return Err(ConfigError::Zero("refresh.max_in_flight"));
        }
        Ok(())
    }

    /// Load from `path` when given, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.overpass.endpoint, DEFAULT_OVERPASS_ENDPOINT);
        assert_eq!(config.overpass.timeout_secs, 15);
        assert_eq!(config.refresh.interval(), Duration::from_secs(600));
        assert_eq!(config.refresh.max_in_flight, 12);
        assert_eq!(config.view.radius_multiplier, RadiusMultiplier::DEFAULT);
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[overpass]
timeout_secs = 30

[view]
default_center = {{ lat = 52.52, lon = 13.405 }}
radius_multiplier = 1.5

[datasets]
clusters = "data/cleaned_data.json"
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.overpass.timeout_secs, 30);
        assert_eq!(config.overpass.endpoint, DEFAULT_OVERPASS_ENDPOINT);
        assert_eq!(config.view.default_center, Coordinate::new(52.52, 13.405));
        assert_eq!(config.view.radius_multiplier.value(), 1.5);
        assert_eq!(
            config.datasets.clusters,
            Some(PathBuf::from("data/cleaned_data.json"))
        );
        assert!(config.datasets.stops.is_none());
    }

    #[test]
    fn test_invalid_multiplier_rejected() {
        let result: Result<Config, _> = toml::from_str("[view]\nradius_multiplier = 3.0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[overpass]\ntimeout_secs = 0").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Zero("overpass.timeout_secs")));
        assert_eq!(err.to_string(), "overpass.timeout_secs must be greater than zero");
    }

    #[test]
    fn test_zero_max_in_flight_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[refresh]\nmax_in_flight = 0").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Zero("refresh.max_in_flight")));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/accessmap.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
