//! Circuit breaker for failing downstream services
//!
//! While open, calls are rejected with `ServiceError::CircuitBroken` without
//! touching the network; the downstream client translates that rejection
//! into `ServiceError::ServiceUnavailable` like any other outage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::core::OutboundPolicy;
use crate::error::{Result, ServiceError};

use super::CircuitBreakerStatus;

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before the circuit opens
    pub failure_threshold: usize,

    /// Time the circuit stays open before test requests are allowed
    pub reset_timeout: Duration,

    /// Number of successful test requests needed to close the circuit
    pub success_threshold: usize,

    /// Trial requests allowed in flight while half-open
    pub half_open_max_calls: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            success_threshold: 2,
            half_open_max_calls: 1,
        }
    }
}

/// A thread-safe circuit breaker implementation
pub struct CircuitBreaker {
    status: RwLock<CircuitBreakerStatus>,

    /// Time when the circuit was opened
    opened_at: RwLock<Option<Instant>>,

    /// Consecutive failures in closed state
    failure_count: AtomicUsize,

    /// Consecutive successes in half-open state
    success_count: AtomicUsize,

    /// Trials admitted in half-open state and not yet reported
    trials_in_flight: AtomicUsize,

    /// Time the current half-open trial window started
    trial_window_started: RwLock<Option<Instant>>,

    total_failures: AtomicUsize,
    total_successes: AtomicUsize,
    total_rejections: AtomicUsize,

    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the specified configuration
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            status: RwLock::new(CircuitBreakerStatus::Closed),
            opened_at: RwLock::new(None),
            failure_count: AtomicUsize::new(0),
            success_count: AtomicUsize::new(0),
            trials_in_flight: AtomicUsize::new(0),
            trial_window_started: RwLock::new(None),
            total_failures: AtomicUsize::new(0),
            total_successes: AtomicUsize::new(0),
            total_rejections: AtomicUsize::new(0),
            config,
        }
    }

    /// Check if the circuit allows a request
    pub fn check(&self) -> Result<()> {
        match self.status() {
            CircuitBreakerStatus::Closed => Ok(()),
            CircuitBreakerStatus::HalfOpen => self.admit_trial(),
            CircuitBreakerStatus::Open => {
                let elapsed = self.opened_duration();

                match elapsed {
                    Some(elapsed) if elapsed < self.config.reset_timeout => {
                        self.total_rejections.fetch_add(1, Ordering::SeqCst);
                        let remaining = self.config.reset_timeout - elapsed;
                        Err(ServiceError::circuit_broken(format!(
                            "Circuit breaker is open, rejecting requests for {}ms more",
                            remaining.as_millis()
                        )))
                    }
                    _ => {
                        self.transition_to_half_open();
                        self.admit_trial()
                    }
                }
            }
        }
    }

    /// Record a successful request
    pub fn record_success(&self) {
        self.total_successes.fetch_add(1, Ordering::SeqCst);

        match self.status() {
            CircuitBreakerStatus::Closed => {
                self.failure_count.store(0, Ordering::SeqCst);
            }
            CircuitBreakerStatus::HalfOpen => {
                let successes = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;

                if successes >= self.config.success_threshold {
                    self.close_circuit();
                } else {
                    self.finish_trial();
                }
            }
            CircuitBreakerStatus::Open => {
                // A call admitted before the circuit opened finished late
                log::debug!("Received success in Open state, ignoring");
            }
        }
    }

    /// Record a failed request
    pub fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::SeqCst);

        match self.status() {
            CircuitBreakerStatus::Closed => {
                let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;

                if failures >= self.config.failure_threshold {
                    self.open_circuit();
                }
            }
            CircuitBreakerStatus::HalfOpen => {
                // Any failure in half-open state reopens the circuit
                self.open_circuit();
            }
            CircuitBreakerStatus::Open => {
                log::debug!("Received failure in Open state, ignoring");
            }
        }
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        self.close_circuit();
    }

    /// Get the current circuit status
    pub fn status(&self) -> CircuitBreakerStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the current number of consecutive failures
    pub fn failure_count(&self) -> usize {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Get the current number of consecutive successes in half-open state
    pub fn success_count(&self) -> usize {
        self.success_count.load(Ordering::SeqCst)
    }

    /// Get metrics about the circuit breaker
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        CircuitBreakerMetrics {
            status: self.status(),
            failure_count: self.failure_count.load(Ordering::SeqCst),
            success_count: self.success_count.load(Ordering::SeqCst),
            total_failures: self.total_failures.load(Ordering::SeqCst),
            total_successes: self.total_successes.load(Ordering::SeqCst),
            total_rejections: self.total_rejections.load(Ordering::SeqCst),
            opened_duration: self.opened_duration(),
        }
    }

    /// Admit a trial request unless the half-open quota is in use
    ///
    /// Trials that never report an outcome (cancelled by the caller) stop
    /// holding their slot once `reset_timeout` has passed.
    fn admit_trial(&self) -> Result<()> {
        let admitted = self
            .trials_in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.config.half_open_max_calls).then_some(n + 1)
            })
            .is_ok();

        if admitted {
            return Ok(());
        }

        let mut window = self.trial_window_started.write().unwrap_or_else(PoisonError::into_inner);
        let stale = window.map_or(true, |started| started.elapsed() >= self.config.reset_timeout);

        if stale {
            *window = Some(Instant::now());
            self.trials_in_flight.store(1, Ordering::SeqCst);
            return Ok(());
        }

        self.total_rejections.fetch_add(1, Ordering::SeqCst);
        Err(ServiceError::circuit_broken(
            "Circuit breaker is half-open, trial request already in flight",
        ))
    }

    fn finish_trial(&self) {
        let _ = self
            .trials_in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    fn opened_duration(&self) -> Option<Duration> {
        let opened_at = *self.opened_at.read().unwrap_or_else(PoisonError::into_inner);
        opened_at.map(|instant| instant.elapsed())
    }

    fn open_circuit(&self) {
        log::warn!("Circuit breaker transitioning to Open state");
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = CircuitBreakerStatus::Open;
        *self.opened_at.write().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.success_count.store(0, Ordering::SeqCst);
        self.trials_in_flight.store(0, Ordering::SeqCst);
    }

    fn close_circuit(&self) {
        log::info!("Circuit breaker transitioning to Closed state");
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = CircuitBreakerStatus::Closed;
        *self.opened_at.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.failure_count.store(0, Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
        self.trials_in_flight.store(0, Ordering::SeqCst);
    }

    fn transition_to_half_open(&self) {
        log::info!("Circuit breaker transitioning to Half-Open state");
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = CircuitBreakerStatus::HalfOpen;
        *self.trial_window_started.write().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.success_count.store(0, Ordering::SeqCst);
        self.trials_in_flight.store(0, Ordering::SeqCst);
    }
}

impl OutboundPolicy for CircuitBreaker {
    fn admit(&self) -> Result<()> {
        self.check()
    }

    fn record_success(&self) {
        CircuitBreaker::record_success(self);
    }

    fn record_failure(&self) {
        CircuitBreaker::record_failure(self);
    }
}

/// Metrics for a circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerMetrics {
    pub status: CircuitBreakerStatus,
    pub failure_count: usize,
    pub success_count: usize,
    pub total_failures: usize,
    pub total_successes: usize,
    /// Calls rejected while open
    pub total_rejections: usize,
    /// Duration the circuit has been open, if applicable
    pub opened_duration: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_circuit_closed_initially() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::default());
        assert_eq!(cb.status(), CircuitBreakerStatus::Closed);
        assert!(cb.check().is_ok());
    }

    #[test]
    fn test_circuit_opens_after_failures() {
        let config = CircuitBreakerConfig {
            failure_threshold: 3,
            ..CircuitBreakerConfig::default()
        };

        let cb = CircuitBreaker::new(config);

        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.status(), CircuitBreakerStatus::Closed);

        cb.record_failure();
        assert_eq!(cb.status(), CircuitBreakerStatus::Open);

        let err = cb.check().unwrap_err();
        assert!(matches!(err, ServiceError::CircuitBroken(_)));
        assert_eq!(cb.metrics().total_rejections, 1);
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let config = CircuitBreakerConfig {
            failure_threshold: 2,
            ..CircuitBreakerConfig::default()
        };

        let cb = CircuitBreaker::new(config);
        cb.record_failure();
        cb.record_success();
        cb.record_failure();

        assert_eq!(cb.status(), CircuitBreakerStatus::Closed);
        assert_eq!(cb.failure_count(), 1);
    }

    #[test]
    fn test_circuit_transitions_to_half_open() {
        let config = CircuitBreakerConfig {
            failure_threshold: 1,
            reset_timeout: Duration::from_millis(100),
            ..CircuitBreakerConfig::default()
        };

        let cb = CircuitBreaker::new(config);

        cb.record_failure();
        assert_eq!(cb.status(), CircuitBreakerStatus::Open);

        thread::sleep(Duration::from_millis(200));

        assert!(cb.check().is_ok());
        assert_eq!(cb.status(), CircuitBreakerStatus::HalfOpen);
    }

    #[test]
    fn test_circuit_closes_after_successes_in_half_open() {
        let config = CircuitBreakerConfig {
            success_threshold: 2,
            ..CircuitBreakerConfig::default()
        };

        let cb = CircuitBreaker::new(config);

        cb.transition_to_half_open();
        assert_eq!(cb.status(), CircuitBreakerStatus::HalfOpen);

        cb.record_success();
        assert_eq!(cb.status(), CircuitBreakerStatus::HalfOpen);

        cb.record_success();
        assert_eq!(cb.status(), CircuitBreakerStatus::Closed);
    }

    #[test]
    fn test_half_open_limits_trials_in_flight() {
        let config = CircuitBreakerConfig {
            failure_threshold: 1,
            reset_timeout: Duration::from_millis(100),
            success_threshold: 2,
            half_open_max_calls: 1,
        };

        let cb = CircuitBreaker::new(config);
        cb.record_failure();
        thread::sleep(Duration::from_millis(150));

        // First caller after the timeout is the trial; the next one waits for it
        assert!(cb.check().is_ok());
        assert!(matches!(cb.check(), Err(ServiceError::CircuitBroken(_))));

        cb.record_success();
        assert_eq!(cb.status(), CircuitBreakerStatus::HalfOpen);

        assert!(cb.check().is_ok());
        cb.record_success();
        assert_eq!(cb.status(), CircuitBreakerStatus::Closed);
        assert!(cb.check().is_ok());
    }

    #[test]
    fn test_abandoned_trial_frees_slot_after_timeout() {
        let config = CircuitBreakerConfig {
            reset_timeout: Duration::from_millis(100),
            ..CircuitBreakerConfig::default()
        };

        let cb = CircuitBreaker::new(config);
        cb.transition_to_half_open();

        assert!(cb.check().is_ok());
        assert!(cb.check().is_err());

        thread::sleep(Duration::from_millis(150));
        assert!(cb.check().is_ok());
    }

    #[test]
    fn test_failure_in_half_open_reopens_circuit() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::default());

        cb.transition_to_half_open();
        cb.record_failure();
        assert_eq!(cb.status(), CircuitBreakerStatus::Open);
    }

    #[test]
    fn test_reset() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::default());

        cb.open_circuit();
        assert_eq!(cb.status(), CircuitBreakerStatus::Open);

        cb.reset();
        assert_eq!(cb.status(), CircuitBreakerStatus::Closed);
        assert_eq!(cb.failure_count(), 0);
        assert_eq!(cb.success_count(), 0);
        assert!(cb.metrics().opened_duration.is_none());
    }
}
