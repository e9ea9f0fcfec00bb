//! Outbound webhook transport

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

/// Per-request timeout for outbound webhook calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status and body returned by a destination webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

impl WebhookResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can POST a JSON body to a webhook URL.
///
/// Implementations are shared across concurrent requests.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Issue a single POST with `Content-Type: application/json`.
    /// Non-2xx statuses are returned as responses, not errors.
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<WebhookResponse>;
}

/// `reqwest`-backed transport with a pooled client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    /// Errors never include the request URL, which carries the webhook key.
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<WebhookResponse> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| e.without_url())?;

        let status = response.status().as_u16();
        // The body is informational only
        let body = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                debug!("Failed to read webhook response body: {}", e.without_url());
                String::new()
            }
        };

        Ok(WebhookResponse { status, body })
    }
}
