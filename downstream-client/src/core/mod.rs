//! Core abstractions for downstream clients
//!
//! This module provides the trait interfaces the client is built around:
//!
//! - `Resource`: A DTO exchanged with one downstream collection
//! - `ResourceRepository`: The CRUD contract upstream callers depend on
//! - `ServiceClient`: Identity of the downstream service behind a client
//! - `OutboundPolicy`: Seam for an external resilience policy (circuit breaker)
//! - `FailureObserver`: Side-effecting observer invoked at the translation boundary
//! - `ClientBuilder`: Builder pattern for creating clients

pub mod builder;
pub use builder::ClientBuilder;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{Result, ServiceError};

/// A plain data record exchanged with one downstream collection
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection segment of the endpoint path, e.g. `tickets`
    const COLLECTION: &'static str;

    /// Singular name used in failure messages, e.g. `ticket`
    const SINGULAR: &'static str;
}

/// CRUD contract over one resource type
///
/// Callers only ever see DTOs, `ServiceError::ServiceUnavailable`, or the
/// original caller-side failure.
#[async_trait]
pub trait ResourceRepository<R: Resource>: Send + Sync {
    /// List every resource owned by `owner_id`
    async fn list(&self, owner_id: &str) -> Result<Vec<R>>;

    /// Fetch one resource
    async fn get(&self, owner_id: &str, resource_id: Uuid) -> Result<R>;

    /// Create a resource and return the server's copy
    async fn create(&self, resource: &R) -> Result<R>;

    /// Delete one resource
    async fn delete(&self, owner_id: &str, resource_id: Uuid) -> Result<()>;
}

/// Identity of the downstream service a client talks to
pub trait ServiceClient: Send + Sync {
    /// Human readable service name carried by unavailability failures
    fn name(&self) -> &str;

    /// The base URL for the service
    fn base_url(&self) -> &Url;
}

/// External resilience policy wrapping the outbound call
///
/// The client does not implement breaking or retrying itself; it only asks
/// for admission and reports outcomes.
pub trait OutboundPolicy: Send + Sync {
    /// Admit a call, or reject it with `ServiceError::CircuitBroken`
    fn admit(&self) -> Result<()>;

    /// Report a call that reached the service and did not fail as unavailable
    fn record_success(&self);

    /// Report a call that failed because the service looked unavailable
    fn record_failure(&self);
}

/// Observer notified at the translation boundary
pub trait FailureObserver: Send + Sync {
    /// A non-success HTTP response, before the failure is raised
    fn on_unsuccessful_response(&self, service: &str, operation: &str, status: u16, body: &str);

    /// A failure that was translated into `ServiceError::ServiceUnavailable`
    fn on_unavailable(&self, _service: &str, _operation: &str, _error: &ServiceError) {}
}
