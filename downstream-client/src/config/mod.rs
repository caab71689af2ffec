//! Configuration management for downstream clients
//!
//! This module loads the downstream base address and related settings from
//! a configuration source before a client is constructed. Environment
//! variables are the default source; in-memory and layered providers exist
//! for tests and static setups.

use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use url::Url;

use crate::error::{Result, ServiceError};
use crate::util::parse_duration;

/// Path prefix used when none is configured
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Owner query parameter used when none is configured
pub const DEFAULT_OWNER_PARAM: &str = "ownerId";

/// Request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get a duration such as `30s`, `500ms` or `2m`
    fn get_duration(&self, key: &str) -> Result<Duration> {
        let value = self.get_string(key)?;
        parse_duration(&value)
            .ok_or_else(|| ServiceError::configuration(format!("Invalid duration for key {}: {}", key, value)))
    }

    /// Get a duration, falling back to `default` only when the key is absent
    fn get_duration_or(&self, key: &str, default: Duration) -> Result<Duration> {
        match self.get_string(key) {
            Ok(_) => self.get_duration(key),
            Err(_) => Ok(default),
        }
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,

    /// Optional namespace for variables (e.g., "TICKETS")
    namespace: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set a namespace for environment variables
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        if let Some(ref namespace) = self.namespace {
            env_key.push_str(namespace);
            env_key.push('_');
        }

        // Uppercase and replace non-alphanumeric with underscores
        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                ServiceError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => {
                ServiceError::configuration(format!("Environment variable is not valid unicode: {}", env_key))
            }
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial values
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// Layered provider: the first provider that knows a key wins
#[derive(Default)]
pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    /// Create a new composite config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the end of the chain
    pub fn add_provider(&mut self, provider: impl ConfigProvider + 'static) {
        self.providers.push(Box::new(provider));
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.providers
            .iter()
            .find_map(|provider| provider.get_string(key).ok())
            .ok_or_else(|| {
                ServiceError::configuration(format!("Configuration key not found in any provider: {}", key))
            })
    }
}

/// Global default configuration provider
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new().with_prefix("GATEWAY")));

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

/// Parse and check a downstream base address
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ServiceError::configuration(format!("Invalid base URL {}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ServiceError::configuration(format!(
            "Base URL must use http or https: {}",
            raw
        )));
    }

    if url.host_str().is_none() {
        return Err(ServiceError::configuration(format!("Base URL has no host: {}", raw)));
    }

    Ok(url)
}

/// Settings for one downstream service
#[derive(Debug, Clone)]
pub struct DownstreamConfig {
    /// Name carried by unavailability failures, e.g. "Ticket Service"
    pub service_name: String,

    /// Base address every request path is joined onto
    pub base_url: Url,

    /// Request timeout applied by the transport
    pub timeout: Duration,

    /// Path prefix in front of every collection
    pub api_prefix: String,
}

impl DownstreamConfig {
    /// Create a configuration with default timeout and prefix
    pub fn new(service_name: impl Into<String>, base_url: &str) -> Result<Self> {
        let config = Self {
            service_name: service_name.into(),
            base_url: parse_base_url(base_url)?,
            timeout: DEFAULT_TIMEOUT,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load `{namespace}_base_url` and friends from a config provider
    ///
    /// `default_name` is used when `{namespace}_service_name` is not set.
    pub fn from_provider<P>(provider: &P, namespace: &str, default_name: &str) -> Result<Self>
    where
        P: ConfigProvider + ?Sized,
    {
        let key = |name: &str| format!("{}_{}", namespace, name);

        let base_url = parse_base_url(&provider.get_string(&key("base_url"))?)?;
        let service_name = provider.get_string_or(&key("service_name"), default_name);
        let timeout = provider.get_duration_or(&key("timeout"), DEFAULT_TIMEOUT)?;
        let api_prefix = provider.get_string_or(&key("api_prefix"), DEFAULT_API_PREFIX);

        let config = Self {
            service_name,
            base_url,
            timeout,
            api_prefix,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for DownstreamConfig {
    fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(ServiceError::configuration("Downstream service name is required"));
        }

        if self.timeout.is_zero() {
            return Err(ServiceError::configuration("Downstream timeout must be positive"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        &self.service_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("key1", "value1");
        provider.set("key2", "250ms");

        assert_eq!(provider.get_string("key1").unwrap(), "value1");
        assert_eq!(provider.get_duration("key2").unwrap(), Duration::from_millis(250));
        assert!(provider.get_string("key3").is_err());
    }

    #[test]
    fn test_env_config_provider() {
        let provider = EnvConfigProvider::new()
            .with_prefix("TEST")
            .with_namespace("CONFIG");

        assert_eq!(provider.format_key("base_url"), "TEST_CONFIG_BASE_URL");
        assert_eq!(provider.format_key("tickets-timeout"), "TEST_CONFIG_TICKETS_TIMEOUT");
    }

    #[test]
    fn test_composite_config_provider() {
        let mut mem1 = MemoryConfigProvider::new();
        mem1.set("key1", "value1");

        let mut mem2 = MemoryConfigProvider::new();
        mem2.set("key1", "shadowed");
        mem2.set("key2", "value2");

        let mut provider = CompositeConfigProvider::new();
        provider.add_provider(mem1);
        provider.add_provider(mem2);

        assert_eq!(provider.get_string("key1").unwrap(), "value1");
        assert_eq!(provider.get_string("key2").unwrap(), "value2");
        assert!(provider.get_string("key3").is_err());
    }

    #[test]
    fn test_parse_base_url() {
        assert!(parse_base_url("http://tickets:8070").is_ok());
        assert!(parse_base_url("https://tickets.internal/").is_ok());
        assert!(parse_base_url("ftp://tickets").is_err());
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("").is_err());
    }
}
