//! Ticket Lookup Example
//!
//! Lists a user's tickets through the Ticket Service client.
//!
//! Configuration comes from the environment:
//!
//! ```text
//! GATEWAY_TICKETS_BASE_URL=http://localhost:8070
//! GATEWAY_TICKETS_TIMEOUT=5s
//! RUST_LOG=downstream_client=debug
//! ```
//!
//! Run with `cargo run --example tickets_lookup -- alice`.

use anyhow::Context;

use downstream_client::config::DEFAULT_PROVIDER;
use downstream_client::tickets::tickets_client_from_provider;
use downstream_client::{init_logging, LoggingConfig, ResourceRepository, ServiceError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(&LoggingConfig::from_provider(&**DEFAULT_PROVIDER))?;

    let username = std::env::args().nth(1).unwrap_or_else(|| "alice".to_string());

    let client = tickets_client_from_provider(&**DEFAULT_PROVIDER)
        .context("Ticket Service client configuration")?;

    println!("Ticket Lookup");
    println!("=============\n");

    match client.list(&username).await {
        Ok(tickets) if tickets.is_empty() => println!("{} has no tickets", username),
        Ok(tickets) => {
            for ticket in tickets {
                println!(
                    "{}  {:<8} {:>6}  {:?}",
                    ticket.ticket_uid, ticket.flight_number, ticket.price, ticket.status
                );
            }
        }
        Err(err @ ServiceError::ServiceUnavailable { .. }) => {
            // What the gateway would turn into a 503 for its own caller
            eprintln!("{}", err);
            if let Some(cause) = err.cause() {
                eprintln!("  caused by: {}", cause);
            }
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
