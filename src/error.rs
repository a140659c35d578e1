//! Error types shared across the library.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single facility fetch.
///
/// Every variant is reported through the marker status line; none of them
/// stop other categories from loading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    /// True for failures of the transport itself (including timeouts).
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Timeout(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::MalformedResponse(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("connection references unknown stop '{0}'")]
    UnknownStop(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("location unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RadiusError {
    #[error("radius multiplier {0} outside 0.5..=2.0")]
    OutOfRange(f64),

    #[error("radius multiplier {0} is not a multiple of 0.5")]
    OffStep(f64),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("invalid overpass endpoint '{endpoint}': {source}")]
    Endpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_transport() {
        assert!(FetchError::Timeout(Duration::from_secs(15)).is_transport());
        assert!(FetchError::Transport("reset".into()).is_transport());
        assert!(!FetchError::MalformedResponse("eof".into()).is_transport());
    }

    #[test]
    fn test_timeout_message() {
        let err = FetchError::Timeout(Duration::from_secs(15));
        assert_eq!(err.to_string(), "request timed out after 15s");
    }
}
