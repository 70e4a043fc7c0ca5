//! HTTP plumbing towards the print service.
//!
//! The store and the queue only see [`PrintTransport`], so tests can swap in
//! an in-memory service.

use crate::error::PrintError;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait PrintTransport: Send + Sync {
    /// GET `url`, returning the body of a successful response.
    async fn get(&self, url: &str) -> Result<String, PrintError>;
    /// POST a JSON document to `url`, returning the body of a successful response.
    async fn post_json(&self, url: &str, body: String) -> Result<String, PrintError>;
}

/// reqwest-backed transport with a fixed request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    content_type: String,
}

impl HttpTransport {
    pub fn new(timeout: Duration, encoding: &str) -> Result<Self, PrintError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PrintError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            content_type: format!("application/json; charset={}", encoding),
        })
    }

    async fn read_body(response: reqwest::Response) -> Result<String, PrintError> {
        let status = response.status();
        if !status.is_success() {
            return Err(PrintError::Transport(format!("HTTP {}", status)));
        }
        response
            .text()
            .await
            .map_err(|e| PrintError::Transport(e.to_string()))
    }
}

#[async_trait]
impl PrintTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, PrintError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PrintError::Transport(e.to_string()))?;
        Self::read_body(response).await
    }

    async fn post_json(&self, url: &str, body: String) -> Result<String, PrintError> {
        tracing::debug!("POST {} ({} bytes)", url, body.len());
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, self.content_type.as_str())
            .body(body)
            .send()
            .await
            .map_err(|e| PrintError::Transport(e.to_string()))?;
        Self::read_body(response).await
    }
}
