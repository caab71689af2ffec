//! Failure classification at the client boundary
//!
//! Every failure is sorted into one of two classes. Failures that a retry or
//! a breaker could eventually fix are collapsed into
//! `ServiceError::ServiceUnavailable`; the rest reach the caller unchanged.

use super::ServiceError;

/// Shape of a failure, independent of its message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The HTTP exchange failed, with or without a response status
    Http,

    /// The outbound policy refused to send the request
    BreakerRejected,

    /// Input validation, decoding, configuration and similar local failures
    Application,
}

/// Outcome of classifying a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Propagate the original failure unchanged
    CallerError,

    /// Wrap the failure into `ServiceError::ServiceUnavailable`
    DownstreamUnavailable,
}

/// Classify a failure from its kind and optional HTTP status
pub fn classify(kind: FailureKind, status: Option<u16>) -> FailureClass {
    match (kind, status) {
        (FailureKind::BreakerRejected, _) => FailureClass::DownstreamUnavailable,
        (FailureKind::Http, None) => FailureClass::DownstreamUnavailable,
        (FailureKind::Http, Some(code)) if code >= 500 => FailureClass::DownstreamUnavailable,
        _ => FailureClass::CallerError,
    }
}

/// Apply the classification: wrap unavailability, pass everything else through
pub fn translate(err: ServiceError, message: &str, service_name: &str) -> ServiceError {
    match err {
        // Already translated by an inner boundary
        ServiceError::ServiceUnavailable { .. } => err,
        _ => match classify(err.failure_kind(), err.status_code()) {
            FailureClass::DownstreamUnavailable => {
                ServiceError::service_unavailable(message, service_name, err)
            }
            FailureClass::CallerError => err,
        },
    }
}

/// Coarse category label for an HTTP status, used in log fields
pub fn status_category(status: u16) -> &'static str {
    match status {
        400 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 => "timeout",
        409 => "conflict",
        429 => "rate_limit",
        400..=499 => "client",
        500..=599 => "server",
        _ => "unknown",
    }
}
