//! Wire transport used by the notification relay.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::error::{BookshelfError, Result};

/// The two requests the relay makes.
pub trait RelayTransport: Send + Sync {
    /// POST `body` as JSON and parse the JSON response.
    ///
    /// Non-2xx statuses and unparseable bodies are errors.
    fn post_json(&self, url: &str, body: &Value) -> impl Future<Output = Result<Value>> + Send;

    /// GET `url` and return the script text of the callback response.
    fn fetch_script(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| BookshelfError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl RelayTransport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| BookshelfError::Transport(format!("POST failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BookshelfError::Transport(format!("POST returned HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| BookshelfError::Transport(format!("Unparseable POST response: {}", e)))
    }

    async fn fetch_script(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BookshelfError::Transport(format!("Relay request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BookshelfError::Transport(format!("Relay request returned HTTP {}", status)));
        }
        Ok(response.text().await?)
    }
}
