//! Overpass API client.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{parse_elements, FacilityGateway, GeoFilterQuery};
use crate::config::OverpassConfig;
use crate::error::{ConfigError, FetchError};
use crate::models::FacilityRecord;

/// Fetches facility nodes from an Overpass interpreter endpoint
#[derive(Clone)]
pub struct OverpassClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl OverpassClient {
    pub fn new(config: &OverpassConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let endpoint = Url::parse(&config.endpoint).map_err(|source| ConfigError::Endpoint {
            endpoint: config.endpoint.clone(),
            source,
        })?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        info!(
            "Overpass client for {} (timeout {}s)",
            endpoint,
            timeout.as_secs()
        );

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request_url(&self, query: &GeoFilterQuery) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("data", &query.to_overpass(self.timeout.as_secs()));
        url
    }
}

#[async_trait]
impl FacilityGateway for OverpassClient {
    async fn fetch(&self, query: &GeoFilterQuery) -> Result<Vec<FacilityRecord>, FetchError> {
        debug!(
            "Querying {} around {} within {:.0}m",
            query.category, query.center, query.radius_meters
        );

        let response = self
            .client
            .get(self.request_url(query))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.timeout)
                } else {
                    FetchError::from(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Overpass query for {} failed with status {}", query.category, status);
            return Err(FetchError::Transport(format!("HTTP {}", status)));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Transport(e.to_string())
            }
        })?;

        let records = parse_elements(query.category, &body)?;
        debug!("{}: {} records", query.category, records.len());
        Ok(records)
    }
}
