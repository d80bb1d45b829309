// Shared HTTP plumbing for provider adapters.
//
// One reqwest::Client is built at startup and cloned into every adapter
// (reqwest clients are reference-counted internally). Timeouts are set per
// request so each provider can use its own budget.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::traits::ProviderError;

/// Connection and timeout settings for one provider endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
    pub timeout: Duration,
}

impl Endpoint {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Build the HTTP client shared by all providers.
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("urlwarden/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Send a request and return the raw response, mapping transport failures.
pub async fn send(request: RequestBuilder, timeout: Duration) -> Result<Response, ProviderError> {
    Ok(request.timeout(timeout).send().await?)
}

/// Require a 2xx status, turning anything else into a transient failure
/// that includes a snippet of the body.
pub async fn require_success(response: Response, what: &str) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(what, status, &body))
}

pub fn status_error(what: &str, status: StatusCode, body: &str) -> ProviderError {
    let snippet: String = body.chars().take(200).collect();
    if snippet.is_empty() {
        ProviderError::Transient(format!("{what} returned {status}"))
    } else {
        ProviderError::Transient(format!("{what} returned {status}: {snippet}"))
    }
}

/// Decode a successful response into `T`, keeping the raw JSON alongside.
pub async fn read_json<T: DeserializeOwned>(
    response: Response,
    what: &str,
) -> Result<(T, serde_json::Value), ProviderError> {
    let bytes = response.bytes().await?;
    let raw: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| ProviderError::Protocol(format!("{what} sent invalid JSON: {e}")))?;
    let parsed = serde_json::from_value(raw.clone())
        .map_err(|e| ProviderError::Protocol(format!("{what} payload shape changed: {e}")))?;
    Ok((parsed, raw))
}
