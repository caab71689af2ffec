//! Shared fixtures for the test modules

use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wiremock::MockServer;

use crate::core::{ClientBuilder, FailureObserver, Resource};
use crate::error::ServiceError;
use crate::services::downstream::DownstreamClient;

pub const TEST_SERVICE: &str = "Order Service";

/// Minimal resource used to exercise the generic client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub owner: String,
    pub item: String,
}

impl Order {
    pub fn new(owner: &str, item: &str) -> Self {
        Self {
            owner: owner.to_string(),
            item: item.to_string(),
        }
    }
}

impl Resource for Order {
    const COLLECTION: &'static str = "orders";
    const SINGULAR: &'static str = "order";
}

/// One call seen by `RecordingObserver`
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Response {
        service: String,
        operation: String,
        status: u16,
        body: String,
    },
    Unavailable {
        service: String,
        operation: String,
        cause: String,
    },
}

/// Observer that keeps everything it is told
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Observed>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Observed> {
        self.events.lock().unwrap().clone()
    }
}

impl FailureObserver for RecordingObserver {
    fn on_unsuccessful_response(&self, service: &str, operation: &str, status: u16, body: &str) {
        self.events.lock().unwrap().push(Observed::Response {
            service: service.to_string(),
            operation: operation.to_string(),
            status,
            body: body.to_string(),
        });
    }

    fn on_unavailable(&self, service: &str, operation: &str, error: &ServiceError) {
        self.events.lock().unwrap().push(Observed::Unavailable {
            service: service.to_string(),
            operation: operation.to_string(),
            cause: error.cause().map(ToString::to_string).unwrap_or_default(),
        });
    }
}

/// Builder pointed at `base_url` with a short timeout and no policy
pub fn builder_for(base_url: &str) -> ClientBuilder {
    ClientBuilder::new()
        .base_url(base_url)
        .service_name(TEST_SERVICE)
        .timeout(Duration::from_secs(5))
}

/// Order client talking to `server`
pub fn order_client(server: &MockServer) -> DownstreamClient<Order> {
    builder_for(&server.uri())
        .build()
        .expect("Failed to build order client")
}

/// Order client reporting to `observer`
pub fn observed_client(server: &MockServer, observer: Arc<RecordingObserver>) -> DownstreamClient<Order> {
    builder_for(&server.uri())
        .observer(observer)
        .build()
        .expect("Failed to build order client")
}

/// Address of a port nobody is listening on
pub fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind probe listener");
    let addr = listener.local_addr().expect("Failed to read probe address");
    drop(listener);
    format!("http://{}", addr)
}
