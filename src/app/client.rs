//! Tile fetch capability
//!
//! [`TileFetcher`] is the seam between the worker pipeline and the HTTP
//! mechanics: it takes the endpoint URL plus the request-scoped parameter
//! map and yields the raw response body, or a failure that the pipeline
//! counts without retrying. [`HttpTileFetcher`] is the production
//! implementation over reqwest; tests substitute stubs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::constants::http;
use crate::errors::{ConfigError, FetchError, FetchResult};

/// Opaque "fetch(url, params) -> bytes | failure" capability
#[async_trait]
pub trait TileFetcher: Send + Sync {
    /// Perform one GetMap request. Non-success statuses are failures.
    async fn fetch(&self, url: &str, params: &BTreeMap<String, String>) -> FetchResult<Vec<u8>>;
}

/// Configuration for the HTTP tile client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Overall request timeout
    pub request_timeout: std::time::Duration,
    /// Connection establishment timeout
    pub connect_timeout: std::time::Duration,
    /// Connection pool idle timeout
    pub pool_idle_timeout: std::time::Duration,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            pool_idle_timeout: http::POOL_IDLE_TIMEOUT,
            pool_max_per_host: http::POOL_MAX_PER_HOST,
        }
    }
}

/// Production tile fetcher over a pooled reqwest client
#[derive(Debug)]
pub struct HttpTileFetcher {
    client: Client,
}

impl HttpTileFetcher {
    /// Build a fetcher with the default client configuration
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_config(ClientConfig::default())
    }

    /// Build a fetcher with a custom client configuration
    pub fn with_config(config: ClientConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(http::USER_AGENT)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_per_host)
            .build()
            .map_err(ConfigError::ClientBuild)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    async fn fetch(&self, url: &str, params: &BTreeMap<String, String>) -> FetchResult<Vec<u8>> {
        let response = self.client.get(url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            debug!("Fetch failed with HTTP {} for {}", status, url);
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}
