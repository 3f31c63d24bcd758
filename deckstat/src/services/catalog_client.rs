//! Remote catalog API client
//!
//! `GET {base_url}/{card|decklist}/{id}.json` over reqwest, with an optional
//! minimum spacing between requests.

use crate::models::ResourceKind;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const USER_AGENT: &str = concat!("deckstat/", env!("CARGO_PKG_VERSION"));

/// Catalog client errors
///
/// Never surfaced past the fetch cache: every variant is retried and then
/// degraded to "missing".
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Body error: {0}")]
    Body(String),
}

/// Source of raw catalog documents
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch the raw body of one document
    ///
    /// Any non-success response is an error.
    async fn get(&self, kind: ResourceKind, id: &str) -> Result<String, CatalogError>;
}

/// Minimum interval between consecutive requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// HTTP catalog client
pub struct HttpCatalogClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl HttpCatalogClient {
    /// # Arguments
    /// * `base_url` - Catalog root, e.g. `https://arkhamdb.com/api/public`
    /// * `timeout_secs` - Per-request timeout
    /// * `request_interval_ms` - Minimum spacing between requests (0 = none)
    pub fn new(base_url: &str, timeout_secs: u64, request_interval_ms: u64) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(request_interval_ms)),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Document URL for a resource
    pub fn url_for(&self, kind: ResourceKind, id: &str) -> String {
        format!("{}/{}/{}.json", self.base_url, kind.api_segment(), id)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn get(&self, kind: ResourceKind, id: &str) -> Result<String, CatalogError> {
        self.rate_limiter.wait().await;

        let url = self.url_for(kind, id);
        tracing::debug!(url = %url, "Querying catalog");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status(status.as_u16(), error_text));
        }

        response
            .text()
            .await
            .map_err(|e| CatalogError::Body(e.to_string()))
    }
}
