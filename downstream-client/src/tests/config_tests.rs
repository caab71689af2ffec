//! Tests for loading downstream settings
//!
//! Covers `DownstreamConfig` loading from providers and building clients
//! from the loaded configuration.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use crate::config::{
        CompositeConfigProvider, DownstreamConfig, EnvConfigProvider, MemoryConfigProvider, ServiceConfig,
        DEFAULT_API_PREFIX, DEFAULT_TIMEOUT,
    };
    use crate::core::{ClientBuilder, ServiceClient};
    use crate::error::ServiceError;
    use crate::tests::support::Order;

    #[test]
    fn test_from_provider_with_defaults() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("orders_base_url", "http://orders.local:8080");

        let config = DownstreamConfig::from_provider(&provider, "orders", "Order Service").unwrap();

        assert_eq!(config.service_name(), "Order Service");
        assert_eq!(config.base_url.as_str(), "http://orders.local:8080/");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.api_prefix, DEFAULT_API_PREFIX);
    }

    #[test]
    fn test_from_provider_overrides() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("orders_base_url", "https://orders.internal");
        provider.set("orders_service_name", "Orders");
        provider.set("orders_timeout", "750ms");
        provider.set("orders_api_prefix", "/v2");

        let config = DownstreamConfig::from_provider(&provider, "orders", "Order Service").unwrap();

        assert_eq!(config.service_name, "Orders");
        assert_eq!(config.timeout, Duration::from_millis(750));
        assert_eq!(config.api_prefix, "/v2");
    }

    #[test]
    fn test_missing_base_url() {
        let provider = MemoryConfigProvider::new();
        let err = DownstreamConfig::from_provider(&provider, "orders", "Order Service").unwrap_err();

        assert!(matches!(err, ServiceError::Configuration(_)));
        assert!(err.to_string().contains("orders_base_url"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut bad_url = MemoryConfigProvider::new();
        bad_url.set("orders_base_url", "orders.local");
        assert!(DownstreamConfig::from_provider(&bad_url, "orders", "Order Service").is_err());

        let mut bad_timeout = MemoryConfigProvider::new();
        bad_timeout.set("orders_base_url", "http://orders.local");
        bad_timeout.set("orders_timeout", "soon");
        let err = DownstreamConfig::from_provider(&bad_timeout, "orders", "Order Service").unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));

        let mut huge_timeout = MemoryConfigProvider::new();
        huge_timeout.set("orders_base_url", "http://orders.local");
        huge_timeout.set("orders_timeout", "400000000000000000m");
        let err = DownstreamConfig::from_provider(&huge_timeout, "orders", "Order Service").unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));

        let mut zero_timeout = MemoryConfigProvider::new();
        zero_timeout.set("orders_base_url", "http://orders.local");
        zero_timeout.set("orders_timeout", "0s");
        assert!(DownstreamConfig::from_provider(&zero_timeout, "orders", "Order Service").is_err());

        assert_err!(DownstreamConfig::new("  ", "http://orders.local"));
    }

    #[test]
    fn test_env_provider_layered_over_defaults() {
        std::env::set_var("DSCLIENT_TEST_ORDERS_BASE_URL", "http://from-env.local");

        let mut defaults = MemoryConfigProvider::new();
        defaults.set("orders_base_url", "http://from-defaults.local");
        defaults.set("orders_timeout", "5s");

        let mut provider = CompositeConfigProvider::new();
        provider.add_provider(EnvConfigProvider::new().with_prefix("DSCLIENT_TEST"));
        provider.add_provider(defaults);

        let config = DownstreamConfig::from_provider(&provider, "orders", "Order Service").unwrap();

        assert_eq!(config.base_url.host_str(), Some("from-env.local"));
        assert_eq!(config.timeout, Duration::from_secs(5));

        std::env::remove_var("DSCLIENT_TEST_ORDERS_BASE_URL");
    }

    #[test]
    fn test_builder_from_config() {
        let config = assert_ok!(DownstreamConfig::new("Order Service", "http://orders.local:8080"));
        let client = assert_ok!(ClientBuilder::from_config(&config).build::<Order>());

        assert_eq!(client.name(), "Order Service");
        assert_eq!(client.base_url().port(), Some(8080));
        assert_eq!(client.owner_param(), "ownerId");
    }

    #[test]
    fn test_builder_requires_base_url_and_name() {
        let err = ClientBuilder::new()
            .service_name("Order Service")
            .build::<Order>()
            .unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));

        let err = ClientBuilder::new()
            .base_url("http://orders.local")
            .build::<Order>()
            .unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));

        let err = ClientBuilder::new()
            .base_url("http://orders.local")
            .service_name("Order Service")
            .owner_param("")
            .build::<Order>()
            .unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
    }
}
