//! Ticket Service client
//!
//! The gateway's view of the Ticket Service: a `DownstreamClient` over
//! `TicketDto`, guarded by a circuit breaker and reporting failures as
//! "Ticket Service".

mod models;
pub use models::*;

use std::sync::Arc;

use crate::config::{ConfigProvider, DownstreamConfig};
use crate::core::{ClientBuilder, OutboundPolicy, ResourceRepository};
use crate::error::Result;
use crate::resilience::CircuitBreakerConfig;
use crate::services::downstream::DownstreamClient;

/// Name carried by every unavailability failure of this client
pub const TICKET_SERVICE_NAME: &str = "Ticket Service";

/// Configuration namespace, e.g. `GATEWAY_TICKETS_BASE_URL`
pub const TICKETS_CONFIG_NAMESPACE: &str = "tickets";

/// The Ticket Service identifies owners by user name
pub const TICKETS_OWNER_PARAM: &str = "username";

/// Ticket Service client
pub type TicketsClient = DownstreamClient<TicketDto>;

/// Contract upstream handlers depend on
pub trait TicketsRepository: ResourceRepository<TicketDto> {}

impl<T: ResourceRepository<TicketDto> + ?Sized> TicketsRepository for T {}

/// Builder pre-configured for the Ticket Service
pub fn tickets_builder(config: &DownstreamConfig) -> ClientBuilder {
    ClientBuilder::from_config(config).owner_param(TICKETS_OWNER_PARAM)
}

/// Create a Ticket Service client with its own circuit breaker
pub fn tickets_client(base_url: &str) -> Result<TicketsClient> {
    let config = DownstreamConfig::new(TICKET_SERVICE_NAME, base_url)?;

    tickets_builder(&config)
        .circuit_breaker(CircuitBreakerConfig::default())
        .build()
}

/// Create a Ticket Service client from `tickets_*` configuration keys
pub fn tickets_client_from_provider<P>(provider: &P) -> Result<TicketsClient>
where
    P: ConfigProvider + ?Sized,
{
    let config = DownstreamConfig::from_provider(provider, TICKETS_CONFIG_NAMESPACE, TICKET_SERVICE_NAME)?;

    tickets_builder(&config)
        .circuit_breaker(CircuitBreakerConfig::default())
        .build()
}

/// Create a Ticket Service client sharing an externally owned policy
pub fn tickets_client_with_policy(
    config: &DownstreamConfig,
    policy: Arc<dyn OutboundPolicy>,
) -> Result<TicketsClient> {
    tickets_builder(config).policy(policy).build()
}
