//! Error handling for downstream clients
//!
//! This module provides the single error type returned by every client
//! operation:
//! - Transport and HTTP failures keep their original shape
//! - Failures that mean "the downstream service is down" are wrapped into
//!   `ServiceError::ServiceUnavailable`, which names the service and keeps
//!   the original failure as its source
//! - Everything else (bad input, 4xx, decode errors) is returned unchanged

use thiserror::Error;

pub mod mapping;

pub use mapping::{classify, translate, FailureClass, FailureKind};

/// Result type for downstream client operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for downstream clients
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Connection-level failures (DNS, refused connection, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// The transport gave up waiting for a response
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// The downstream service answered with a non-success status
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The outbound policy rejected the call without sending it
    #[error("Circuit broken: {0}")]
    CircuitBroken(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// A success status arrived without the body the operation needs
    #[error("Missing response body: {0}")]
    MissingBody(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The caller abandoned the operation
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// The downstream service is unavailable
    #[error("{service_name} unavailable: {message}")]
    ServiceUnavailable {
        message: String,
        service_name: String,
        #[source]
        source: Box<ServiceError>,
    },
}

impl ServiceError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        ServiceError::Timeout(message.into())
    }

    /// Create an HTTP status error
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        ServiceError::Status {
            status,
            body: body.into(),
        }
    }

    /// Create a circuit broken error
    pub fn circuit_broken(message: impl Into<String>) -> Self {
        ServiceError::CircuitBroken(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Create a parsing error
    pub fn parsing(message: impl Into<String>) -> Self {
        ServiceError::Parsing(message.into())
    }

    /// Create a missing body error
    pub fn missing_body(message: impl Into<String>) -> Self {
        ServiceError::MissingBody(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Create a cancellation error
    pub fn cancelled(message: impl Into<String>) -> Self {
        ServiceError::Cancelled(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }

    /// Wrap a failure into the uniform unavailability error
    pub fn service_unavailable(
        message: impl Into<String>,
        service_name: impl Into<String>,
        cause: ServiceError,
    ) -> Self {
        ServiceError::ServiceUnavailable {
            message: message.into(),
            service_name: service_name.into(),
            source: Box::new(cause),
        }
    }

    /// HTTP status carried by this failure, if the downstream answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Shape of the failure as seen by the classifier
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ServiceError::Network(_) | ServiceError::Timeout(_) | ServiceError::Status { .. } => {
                FailureKind::Http
            }
            ServiceError::CircuitBroken(_) => FailureKind::BreakerRejected,
            _ => FailureKind::Application,
        }
    }

    /// Classification of this failure at the client boundary
    pub fn class(&self) -> FailureClass {
        match self {
            ServiceError::ServiceUnavailable { .. } => FailureClass::DownstreamUnavailable,
            _ => classify(self.failure_kind(), self.status_code()),
        }
    }

    /// Check if this failure means the downstream service is unavailable
    pub fn is_unavailable(&self) -> bool {
        self.class() == FailureClass::DownstreamUnavailable
    }

    /// Name of the unavailable service, for translated failures
    pub fn service_name(&self) -> Option<&str> {
        match self {
            ServiceError::ServiceUnavailable { service_name, .. } => Some(service_name),
            _ => None,
        }
    }

    /// Original failure behind a translated one
    pub fn cause(&self) -> Option<&ServiceError> {
        match self {
            ServiceError::ServiceUnavailable { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convert reqwest errors to ServiceError
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ServiceError::network(format!("Connection error: {}", err))
        } else if err.is_decode() {
            ServiceError::parsing(format!("Response decode error: {}", err))
        } else if err.is_builder() {
            ServiceError::validation(format!("Invalid request: {}", err))
        } else if let Some(status) = err.status() {
            ServiceError::status(status.as_u16(), err.to_string())
        } else if err.is_request() || err.is_body() || err.is_redirect() {
            ServiceError::network(format!("Request failed: {}", err))
        } else {
            ServiceError::internal(format!("HTTP client error: {}", err))
        }
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::parsing(format!("JSON error: {}", err))
    }
}
