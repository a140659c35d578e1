//! Device location collaborator.
//!
//! A provider may not have a fix yet; callers poll it with backoff and fall
//! back to a configured center when it never answers.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::LocationError;
use crate::models::Coordinate;

/// Best-effort source of the current device coordinate
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// `None` while no fix is available yet
    async fn current_location(&self) -> Option<Coordinate>;
}

/// Reads `lat,lon` from a file kept up to date by a positioning daemon.
///
/// A missing or unparseable file counts as no fix yet.
#[derive(Debug, Clone)]
pub struct FileLocation {
    path: PathBuf,
}

impl FileLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(text: &str) -> Option<Coordinate> {
        let (lat, lon) = text.trim().split_once(',')?;
        Some(Coordinate::new(
            lat.trim().parse().ok()?,
            lon.trim().parse().ok()?,
        ))
    }
}

#[async_trait]
impl LocationProvider for FileLocation {
    async fn current_location(&self) -> Option<Coordinate> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => {
                let parsed = Self::parse(&text);
                if parsed.is_none() {
                    debug!("Unreadable location in {}", self.path.display());
                }
                parsed
            }
            Err(e) => {
                debug!("No location file at {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

/// Exponential polling schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub attempts: u32,
}

impl Backoff {
    /// Delay after the `attempt`-th failed poll (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// Poll `provider` until it yields a valid coordinate or attempts run out.
pub async fn wait_for_location<P>(provider: &P, backoff: Backoff) -> Result<Coordinate, LocationError>
where
    P: LocationProvider + ?Sized,
{
    let attempts = backoff.attempts.max(1);
    for attempt in 0..attempts {
        match provider.current_location().await {
            Some(coordinate) if coordinate.is_valid() => {
                info!("Location fix at {}", coordinate);
                return Ok(coordinate);
            }
            Some(coordinate) => debug!("Ignoring invalid location {}", coordinate),
            None => debug!("Location pending (attempt {}/{})", attempt + 1, attempts),
        }

        if attempt + 1 < attempts {
            tokio::time::sleep(backoff.delay(attempt)).await;
        }
    }

    Err(LocationError::Unavailable { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Fixed(Option<Coordinate>);

    #[async_trait]
    impl LocationProvider for Fixed {
        async fn current_location(&self) -> Option<Coordinate> {
            self.0
        }
    }

    /// Answers after a number of pending polls
    struct WarmingUp {
        polls: AtomicU32,
        ready_after: u32,
    }

    #[async_trait]
    impl LocationProvider for WarmingUp {
        async fn current_location(&self) -> Option<Coordinate> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            (n >= self.ready_after).then(|| Coordinate::new(52.52, 13.405))
        }
    }

    fn quick() -> Backoff {
        Backoff {
            initial: Duration::from_millis(1),
            max: Duration::from_millis(4),
            attempts: 5,
        }
    }

    #[test]
    fn test_backoff_delays() {
        let backoff = Backoff {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(5),
            attempts: 10,
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(250));
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(3), Duration::from_secs(2));
        assert_eq!(backoff.delay(5), Duration::from_secs(5));
        assert_eq!(backoff.delay(40), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_waits_for_pending_provider() {
        let provider = WarmingUp {
            polls: AtomicU32::new(0),
            ready_after: 3,
        };
        let location = wait_for_location(&provider, quick()).await.unwrap();
        assert_eq!(location, Coordinate::new(52.52, 13.405));
        assert_eq!(provider.polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_gives_up() {
        let err = wait_for_location(&Fixed(None), quick()).await.unwrap_err();
        assert_eq!(err, LocationError::Unavailable { attempts: 5 });
    }

    #[tokio::test]
    async fn test_invalid_fix_is_pending() {
        let provider = Fixed(Some(Coordinate::new(120.0, 0.0)));
        assert!(wait_for_location(&provider, quick()).await.is_err());
    }

    #[test]
    fn test_parse_location_text() {
        assert_eq!(
            FileLocation::parse(" 52.52, 13.405\n"),
            Some(Coordinate::new(52.52, 13.405))
        );
        assert_eq!(FileLocation::parse("52.52"), None);
        assert_eq!(FileLocation::parse("north,east"), None);
    }

    #[tokio::test]
    async fn test_file_location_appears_later() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fix.txt");
        let provider = FileLocation::new(&path);
        assert_eq!(provider.current_location().await, None);

        let writer_path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            tokio::fs::write(writer_path, "48.1372,11.5756").await.unwrap();
        });

        let backoff = Backoff {
            initial: Duration::from_millis(2),
            max: Duration::from_millis(20),
            attempts: 50,
        };
        let location = wait_for_location(&provider, backoff).await.unwrap();
        assert_eq!(location, Coordinate::new(48.1372, 11.5756));
    }
}
