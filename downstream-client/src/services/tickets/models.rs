//! Ticket Service data models
//!
//! This module contains the DTOs exchanged with the Ticket Service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::Resource;

/// Lifecycle status of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Purchased and valid
    Paid,

    /// Returned by the owner
    Canceled,
}

/// A purchased flight ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDto {
    /// Ticket identifier assigned by the Ticket Service
    pub ticket_uid: Uuid,

    /// Owner of the ticket
    pub username: String,

    /// Flight the ticket is for
    pub flight_number: String,

    /// Price paid, in whole currency units
    pub price: i64,

    /// Current status
    pub status: TicketStatus,
}

impl TicketDto {
    /// A freshly paid ticket with a client-generated identifier
    pub fn new_paid(username: impl Into<String>, flight_number: impl Into<String>, price: i64) -> Self {
        Self {
            ticket_uid: Uuid::new_v4(),
            username: username.into(),
            flight_number: flight_number.into(),
            price,
            status: TicketStatus::Paid,
        }
    }
}

impl Resource for TicketDto {
    const COLLECTION: &'static str = "tickets";
    const SINGULAR: &'static str = "ticket";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ticket_wire_format() {
        let uid = Uuid::parse_str("049161e6-0fb1-4f1f-b1bb-83a9b4bd9c1b").unwrap();
        let ticket = TicketDto {
            ticket_uid: uid,
            username: "alice".to_string(),
            flight_number: "AFL031".to_string(),
            price: 1500,
            status: TicketStatus::Canceled,
        };

        let value = serde_json::to_value(&ticket).unwrap();
        assert_eq!(
            value,
            json!({
                "ticketUid": "049161e6-0fb1-4f1f-b1bb-83a9b4bd9c1b",
                "username": "alice",
                "flightNumber": "AFL031",
                "price": 1500,
                "status": "CANCELED"
            })
        );
    }

    #[test]
    fn test_new_paid() {
        let ticket = TicketDto::new_paid("bob", "SU100", 900);
        assert_eq!(ticket.status, TicketStatus::Paid);
        assert_eq!(ticket.username, "bob");
        assert!(!ticket.ticket_uid.is_nil());
    }
}
