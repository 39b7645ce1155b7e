use crate::types::{CollectorError, FetchConfig, Result, Transport, TransportError};
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

/// HTTP transport backed by `reqwest`.
///
/// Any non-2xx answer is an error; 5xx answers are reported as server errors
/// so the collector can skip the page instead of aborting.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            Policy::limited(config.max_redirects)
        } else {
            Policy::none()
        };

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(redirect)
            .build()
            .map_err(|e| CollectorError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for Fetcher {
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> std::result::Result<String, TransportError> {
        let start_time = Instant::now();
        let network_error = |e: reqwest::Error| TransportError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).query(params).send().await.map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            debug!("HTTP {} from {}", status, url);
            return Err(TransportError::from_status(status.as_u16(), url));
        }

        let content = response.text().await.map_err(network_error)?;
        debug!(
            "Fetched {} ({} bytes in {} ms)",
            url,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }
}
