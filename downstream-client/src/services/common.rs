//! Common utilities for downstream clients
//!
//! This module provides shared functionality for all service clients.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Result, ServiceError};

/// UserAgent structure for identifying the gateway to downstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "FlightBooking-Gateway".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: Some("downstream-client".to_string()),
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Build a standard HTTP client with default settings
pub fn build_http_client(
    user_agent: Option<UserAgent>,
    timeout: Option<Duration>,
    default_headers: header::HeaderMap,
    compression: bool,
) -> Result<Client> {
    let mut headers = default_headers;
    let ua = user_agent.unwrap_or_default().to_string();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&ua).map_err(|e| {
            ServiceError::configuration(format!("Invalid user agent: {}", e))
        })?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout.unwrap_or_else(|| Duration::from_secs(30)))
        .gzip(compression)
        .build()
        .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Join `path` onto `base` and append URL-encoded query pairs in order
pub fn build_target(base: &Url, path: &str, query: &[(&str, &str)]) -> Result<Url> {
    let mut url = base
        .join(path)
        .map_err(|e| ServiceError::validation(format!("Invalid target path {}: {}", path, e)))?;

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

/// Run `future` unless `cancel` fires first
pub async fn run_cancellable<T, F>(cancel: &CancellationToken, what: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(ServiceError::cancelled(format!("{} cancelled before start", what)));
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ServiceError::cancelled(format!("{} cancelled", what))),
        result = future => result,
    }
}

/// Read a response body as text for diagnostics
///
/// A body that cannot be read is reported in place of the content; the
/// caller is already on a failure path.
pub async fn read_body_text(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<unreadable response body: {}>", e),
    }
}

/// Decode a success body, treating an empty body or JSON `null` as missing
pub async fn decode_required<T>(response: reqwest::Response, what: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let bytes = response.bytes().await?;
    decode_required_bytes(&bytes, what)
}

/// Decode already-read body bytes, treating an empty body or JSON `null` as missing
pub fn decode_required_bytes<T>(bytes: &[u8], what: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ServiceError::missing_body(format!("{}: empty response body", what)));
    }

    match serde_json::from_slice::<Option<T>>(bytes)? {
        Some(value) => Ok(value),
        None => Err(ServiceError::missing_body(format!("{}: null response body", what))),
    }
}
