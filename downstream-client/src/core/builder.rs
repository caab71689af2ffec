//! Client builder implementation
//!
//! Provides a unified builder pattern for creating and configuring
//! downstream clients.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::{parse_base_url, DownstreamConfig, DEFAULT_API_PREFIX, DEFAULT_OWNER_PARAM};
use crate::core::{FailureObserver, OutboundPolicy, Resource};
use crate::error::{Result, ServiceError};
use crate::logging::TracingObserver;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};
use crate::services::common::{build_http_client, UserAgent};
use crate::services::downstream::{ClientInner, DownstreamClient};

/// Unified client builder for all downstream clients
pub struct ClientBuilder {
    /// Base URL for the service
    base_url: Option<String>,

    /// Service name reported in unavailability failures
    service_name: Option<String>,

    /// Path prefix in front of every collection
    api_prefix: String,

    /// Query parameter carrying the owner id
    owner_param: String,

    /// Custom headers to include with all requests
    custom_headers: HashMap<String, String>,

    /// Request timeout
    timeout: Option<Duration>,

    /// User agent
    user_agent: Option<UserAgent>,

    /// Enable response decompression
    compression: bool,

    /// Circuit breaker configuration
    circuit_breaker_config: Option<CircuitBreakerConfig>,

    /// Externally owned outbound policy
    policy: Option<Arc<dyn OutboundPolicy>>,

    /// Observer notified at the translation boundary
    observer: Option<Arc<dyn FailureObserver>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            service_name: None,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            owner_param: DEFAULT_OWNER_PARAM.to_string(),
            custom_headers: HashMap::new(),
            timeout: Some(Duration::from_secs(30)), // Default 30s timeout
            user_agent: None,
            compression: true,
            circuit_breaker_config: None,
            policy: None,
            observer: None,
        }
    }
}

impl ClientBuilder {
    /// Create a new client builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder pre-filled from loaded configuration
    pub fn from_config(config: &DownstreamConfig) -> Self {
        Self::new()
            .base_url(config.base_url.as_str())
            .service_name(config.service_name.clone())
            .api_prefix(config.api_prefix.clone())
            .timeout(config.timeout)
    }

    /// Set the base URL for the service
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the service name carried by unavailability failures
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Set the path prefix, e.g. `/api/v1`
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Set the query parameter name carrying the owner id
    pub fn owner_param(mut self, name: impl Into<String>) -> Self {
        self.owner_param = name.into();
        self
    }

    /// Add a custom header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(key.into(), value.into());
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, user_agent: UserAgent) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// Enable or disable response decompression
    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Guard the client with a private circuit breaker
    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker_config = Some(config);
        self
    }

    /// Guard the client with an externally owned policy; overrides `circuit_breaker`
    pub fn policy(mut self, policy: Arc<dyn OutboundPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Replace the default tracing observer
    pub fn observer(mut self, observer: Arc<dyn FailureObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Build an HTTP client with the configured settings
    pub fn build_http_client(&self) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        for (key, value) in &self.custom_headers {
            let header_name = HeaderName::from_str(key)
                .map_err(|e| ServiceError::configuration(format!("Invalid header name: {}", e)))?;

            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ServiceError::configuration(format!("Invalid header value: {}", e)))?;

            headers.insert(header_name, header_value);
        }

        build_http_client(self.user_agent.clone(), self.timeout, headers, self.compression)
    }

    /// Build a client for resource type `R`
    pub fn build<R: Resource>(self) -> Result<DownstreamClient<R>> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| ServiceError::configuration("Base URL is required"))?;
        let base_url = parse_base_url(base_url)?;

        let service_name = self
            .service_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ServiceError::configuration("Service name is required"))?;

        if self.owner_param.trim().is_empty() {
            return Err(ServiceError::configuration("Owner query parameter name is required"));
        }

        let http = self.build_http_client()?;

        let policy = match (self.policy, self.circuit_breaker_config) {
            (Some(policy), _) => Some(policy),
            (None, Some(config)) => {
                Some(Arc::new(CircuitBreaker::new(config)) as Arc<dyn OutboundPolicy>)
            }
            (None, None) => None,
        };

        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(TracingObserver::default()));

        Ok(DownstreamClient::from_inner(ClientInner {
            http,
            service_name,
            base_url,
            api_prefix: normalize_prefix(&self.api_prefix),
            owner_param: self.owner_param,
            policy,
            observer,
        }))
    }
}

/// `api/v1/` and `/api/v1` both become `/api/v1`; an empty prefix stays empty
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/api/v1"), "/api/v1");
        assert_eq!(normalize_prefix("api/v1/"), "/api/v1");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let builder = ClientBuilder::new().header("bad header", "value");
        let err = builder.build_http_client().unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
    }
}
