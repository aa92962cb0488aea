//! REST client for the scraper's HTTP endpoints.
//!
//! Every request carries the configured timeout; a timeout, connection
//! failure or non-2xx status is an ordinary error that callers turn into
//! [`CoreError::BackendUnavailable`].

use std::time::Duration;

use islandboard_core::error::CoreError;
use serde_json::Value;

/// HTTP client for the scraper service.
#[derive(Clone)]
pub struct ScraperApi {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the scraper REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ScraperApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The scraper returned a non-2xx status code.
    #[error("Scraper API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response parsed but did not have the expected shape.
    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

impl From<ScraperApiError> for CoreError {
    fn from(err: ScraperApiError) -> Self {
        CoreError::BackendUnavailable(err.to_string())
    }
}

impl ScraperApi {
    /// Create a client for `base_url` (e.g. `http://localhost:8000`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ScraperApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing [`reqwest::Client`]; its timeout applies.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<Value, ScraperApiError> {
        self.get_json("/health").await
    }

    /// `GET /lottery/summary/all`, split into `(island, envelope)` pairs.
    pub async fn summary_all(&self) -> Result<Vec<(String, Value)>, ScraperApiError> {
        let body = self.get_json("/lottery/summary/all").await?;
        split_summary(body)
    }

    /// `GET /lottery/latest/{island}`.
    pub async fn latest(&self, island_id: &str) -> Result<Value, ScraperApiError> {
        self.get_json(&format!("/lottery/latest/{island_id}")).await
    }

    /// `GET /lottery/history/{island}?days=N`.
    pub async fn history(&self, island_id: &str, days: u32) -> Result<Value, ScraperApiError> {
        let response = self
            .client
            .get(format!("{}/lottery/history/{island_id}", self.base_url))
            .query(&[("days", days)])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /lottery/manual-entry`.
    pub async fn manual_entry(&self, record: &Value) -> Result<Value, ScraperApiError> {
        let response = self
            .client
            .post(format!("{}/lottery/manual-entry", self.base_url))
            .json(record)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    async fn get_json(&self, path: &str) -> Result<Value, ScraperApiError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ScraperApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ScraperApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ScraperApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ScraperApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Split a summary body into per-island envelopes.
///
/// Accepted shapes: `{ "<island>": envelope, ... }`, `[envelope, ...]`
/// with each envelope naming its `island`, or either of those wrapped in
/// `{ "data": ... }` or `{ "islands": ... }`.
pub fn split_summary(body: Value) -> Result<Vec<(String, Value)>, ScraperApiError> {
    let body = match body {
        Value::Object(mut map) if map.len() == 1 && (map.contains_key("data") || map.contains_key("islands")) => {
            map.remove("data")
                .or_else(|| map.remove("islands"))
                .unwrap_or(Value::Null)
        }
        other => other,
    };

    match body {
        Value::Object(map) => Ok(map
            .into_iter()
            .filter(|(_, envelope)| envelope.is_object())
            .collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|envelope| {
                let island = envelope.get("island")?.as_str()?.to_string();
                Some((island, envelope))
            })
            .collect()),
        other => Err(ScraperApiError::Shape(format!(
            "expected an object or array of island envelopes, got {other}"
        ))),
    }
}
