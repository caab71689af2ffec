//! Downstream client implementations
//!
//! `downstream` holds the generic resilient repository; the other modules
//! bind it to concrete downstream services.

pub mod common;
pub mod downstream;
pub mod tickets;

pub use common::UserAgent;
pub use downstream::{DownstreamClient, Operation};
