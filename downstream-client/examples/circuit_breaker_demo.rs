//! Circuit Breaker Demo
//!
//! Points an order client at a port nobody listens on and shows how the
//! circuit breaker starts rejecting calls locally once the failure
//! threshold is reached.

use std::net::TcpListener;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use downstream_client::error::Result;
use downstream_client::{
    client, init_logging, CircuitBreakerConfig, LoggingConfig, Resource, ResourceRepository, ServiceError,
};

#[derive(Debug, Serialize, Deserialize)]
struct Order {
    owner: String,
    item: String,
}

impl Resource for Order {
    const COLLECTION: &'static str = "orders";
    const SINGULAR: &'static str = "order";
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&LoggingConfig::default())?;

    println!("Circuit Breaker Demo");
    println!("====================\n");

    // Reserve a port and release it so connections are refused
    let addr = TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map_err(|e| ServiceError::internal(format!("Failed to reserve a port: {}", e)))?;

    let orders = client()
        .base_url(format!("http://{}", addr))
        .service_name("Order Service")
        .timeout(Duration::from_secs(1))
        .circuit_breaker(CircuitBreakerConfig {
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(10),
            ..CircuitBreakerConfig::default()
        })
        .build::<Order>()?;

    for attempt in 1..=5 {
        match orders.list("alice").await {
            Ok(list) => println!("Attempt {}: {} orders", attempt, list.len()),
            Err(err) => {
                let cause = err.cause().map(ToString::to_string).unwrap_or_default();
                println!("Attempt {}: {}\n  caused by: {}", attempt, err, cause);
            }
        }
    }

    println!("\nThe last attempts never left the process.");

    Ok(())
}
