//! Page fetching for the publisher crawlers.
//!
//! Crawlers only see the [`PageFetcher`] trait, so tests can serve fixture
//! HTML instead of hitting the network.

use crate::config::ScrapingConfig;
use crate::error::ScraperError;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Source of raw HTML pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the page at `url` and returns its body.
    async fn fetch(&self, url: &Url) -> Result<String, ScraperError>;
}

/// Creates the HTTP client used by [`HttpFetcher`].
pub fn create_http_client(config: &ScrapingConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
}

/// Applies rate limiting delay.
pub async fn rate_limit(delay_sec: f64) {
    if delay_sec > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(delay_sec)).await;
    }
}

/// Fetches pages over HTTP with a fixed delay before every request.
pub struct HttpFetcher {
    client: reqwest::Client,
    delay_sec: f64,
}

impl HttpFetcher {
    /// Creates a fetcher with its own client.
    pub fn new(config: &ScrapingConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            client: create_http_client(config)?,
            delay_sec: config.delay_between_requests_sec,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, ScraperError> {
        rate_limit(self.delay_sec).await;

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
