//! HTTP client for plugin hosts
//!
//! A [`HostClient`] wraps a connection pool bound to a single plugin's host
//! for the duration of one run, with request rate limiting shared across all
//! worker tasks of that run. The client is dropped (and its pool released)
//! when the plugin cleans up; it is never shared across plugins or runs.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `download`: per-item fetch-to-file operations with the collision and
//!   retry policies

use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::Client;
use url::Url;

use crate::errors::{ConfigError, ConfigResult, DownloadError, DownloadResult};

pub mod config;
pub mod download;

pub use config::ClientConfig;
pub use download::FileFetcher;

/// HTTP client bound to one plugin host
#[derive(Debug)]
pub struct HostClient {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
    base_url: Url,
    host: String,
}

impl HostClient {
    /// Creates a new client for the given host
    ///
    /// A bare host name defaults to the `https` scheme; an explicit scheme
    /// (`http://...`) is honored as given.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the host does not form a valid base URL, the
    /// rate limit is zero, or the HTTP client cannot be constructed.
    pub fn new(host: &str, config: &ClientConfig) -> ConfigResult<Self> {
        let base_url = Self::base_url_for_host(host)?;
        let client = config.build_http_client()?;
        let rate_limiter = Self::build_rate_limiter(config.rate_limit_rps)?;

        Ok(Self {
            client,
            rate_limiter,
            base_url,
            host: host.to_string(),
        })
    }

    /// Builds the base URL for a host string, defaulting the scheme
    fn base_url_for_host(host: &str) -> ConfigResult<Url> {
        let address = if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };

        Url::parse(&address).map_err(|e| ConfigError::InvalidValue {
            field: "host".to_string(),
            value: host.to_string(),
            reason: e.to_string(),
        })
    }

    /// Builds the rate limiter with the specified requests-per-second quota
    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> ConfigResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(std::num::NonZeroU32::new(rate_limit_rps).ok_or_else(
            || ConfigError::InvalidValue {
                field: "rate_limit_rps".to_string(),
                value: rate_limit_rps.to_string(),
                reason: "rate limit must be non-zero".to_string(),
            },
        )?);
        Ok(RateLimiter::direct(quota))
    }

    /// Host string the client was created for
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a locator against the host base URL
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::InvalidUrl` if the locator cannot be joined.
    pub fn resolve(&self, locator: &str) -> DownloadResult<Url> {
        self.base_url
            .join(locator)
            .map_err(|source| DownloadError::InvalidUrl {
                url: format!("{}{}", self.host, locator),
                source,
            })
    }

    /// Fetches the HTTP response for a URL, subject to the shared rate limit
    ///
    /// Status handling is left to the caller; transport-level failures
    /// surface as `DownloadError::Http`.
    pub async fn get_response(&self, url: &Url) -> DownloadResult<reqwest::Response> {
        // Jitter spreads concurrent workers off the quota boundary
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let response = self.client.get(url.clone()).send().await?;
        tracing::debug!("fetched {} ({})", url, response.status());
        Ok(response)
    }

    /// Fetches the body of a URL as text
    ///
    /// Convenience for data sources that retrieve catalog documents.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::ServerStatus` on a non-success response.
    pub async fn get_page(&self, url: &Url) -> DownloadResult<String> {
        let response = self.get_response(url).await?;
        if !response.status().is_success() {
            return Err(DownloadError::ServerStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}
