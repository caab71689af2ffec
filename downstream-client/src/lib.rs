//! # Downstream Client
//!
//! Resilient HTTP repositories a gateway uses to call its downstream
//! microservices.
//!
//! This crate provides:
//!
//! - A generic CRUD client (`DownstreamClient`) over one resource collection
//! - A uniform failure contract: outages become `ServiceError::ServiceUnavailable`,
//!   caller-side failures are returned unchanged
//! - A circuit breaker that plugs in as the outbound policy
//! - Configuration loading and logging setup
//!
//! ## Architecture
//!
//! - `ResourceRepository`: The contract upstream callers depend on
//! - `OutboundPolicy`: Seam for the resilience policy wrapping the transport
//! - `FailureObserver`: Notified of failed responses before they are raised
//! - `ServiceError`: The single error type, classified by `error::classify`

pub mod core;
pub use crate::core::{ClientBuilder, FailureObserver, OutboundPolicy, Resource, ResourceRepository, ServiceClient};

pub mod services;
pub use services::tickets;
pub use services::{DownstreamClient, Operation};

pub mod error;
pub use error::{FailureClass, FailureKind, Result, ServiceError};

pub mod resilience;
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStatus};

pub mod config;
pub use config::{ConfigProvider, DownstreamConfig, ServiceConfig};

pub mod logging;
pub use logging::{init_logging, LoggingConfig, TracingObserver};

mod util;

#[cfg(test)]
mod tests;

pub use tokio_util::sync::CancellationToken;

/// Create a new default client builder
pub fn client() -> crate::core::ClientBuilder {
    crate::core::ClientBuilder::new()
}
