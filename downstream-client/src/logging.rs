//! Logging setup and the default failure observer
//!
//! `init_logging` installs the global tracing subscriber from configuration.
//! `TracingObserver` turns non-success downstream responses into structured
//! warnings, recorded before the failure reaches the caller.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::{ConfigProvider, ConfigProviderExt};
use crate::core::FailureObserver;
use crate::error::{mapping, Result, ServiceError};
use crate::util::{sanitize_for_logging, truncate_string};

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Longest response body excerpt written to the log
pub const MAX_LOGGED_BODY_CHARS: usize = 1024;

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,

    /// Emit JSON lines instead of human readable text
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Read `log_level` and `log_format` (`text` or `json`)
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Self {
        let defaults = Self::default();
        let format = provider.get_string_or("log_format", "text");

        Self {
            level: provider.get_string_or("log_level", &defaults.level),
            json_format: format.eq_ignore_ascii_case("json"),
        }
    }
}

/// Install the global subscriber; later calls are no-ops
///
/// A subscriber installed by the host application is left in place and
/// counts as initialized. Only an invalid filter directive is an error.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if LOGGING_INITIALIZED.load(Ordering::SeqCst) {
        return Ok(());
    }

    install_subscriber(config)?;
    LOGGING_INITIALIZED.store(true, Ordering::SeqCst);

    Ok(())
}

fn install_subscriber(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ServiceError::configuration(format!("Invalid log filter {}: {}", config.level, e)))?;

    let registry = Registry::default().with(filter);

    let installed = if config.json_format {
        registry
            .with(fmt::layer().json().flatten_event(true).with_target(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    // Lost the race to another caller, or the host set its own subscriber
    if let Err(e) = installed {
        tracing::debug!("Global subscriber already installed: {}", e);
    }

    Ok(())
}

/// Observer that records downstream failures as tracing events
#[derive(Debug, Clone)]
pub struct TracingObserver {
    max_body_chars: usize,
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self {
            max_body_chars: MAX_LOGGED_BODY_CHARS,
        }
    }
}

impl TracingObserver {
    /// Create an observer that logs at most `max_body_chars` of each body
    pub fn with_body_limit(max_body_chars: usize) -> Self {
        Self { max_body_chars }
    }

    /// Body excerpt as it will appear in the log
    pub fn excerpt(&self, body: &str) -> String {
        truncate_string(&sanitize_for_logging(body), self.max_body_chars)
    }
}

impl FailureObserver for TracingObserver {
    fn on_unsuccessful_response(&self, service: &str, operation: &str, status: u16, body: &str) {
        warn!(
            service = %service,
            operation = %operation,
            status = status,
            category = mapping::status_category(status),
            body = %self.excerpt(body),
            "Downstream request failed"
        );
    }

    fn on_unavailable(&self, service: &str, operation: &str, error: &ServiceError) {
        let cause = error.cause().map(ToString::to_string).unwrap_or_default();
        warn!(
            service = %service,
            operation = %operation,
            cause = %cause,
            "Downstream service unavailable"
        );
    }
}
