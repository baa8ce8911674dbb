//! # Logging Setup
//!
//! The library never installs a subscriber on its own: events emitted by the
//! driver go nowhere until the host calls `qc_evm_init_logging`, which
//! installs a `tracing-subscriber` stack writing to stderr.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `QC_LOG_LEVEL` | filter directive | `RUST_LOG`, then `warn` |
//! | `QC_JSON_LOGS` | JSON output (`true`/`1`) | plain text |

use std::env;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive did not parse.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    SubscriberInit(String),
}

/// Subscriber configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `qc_evm_ffi=debug`.
    pub log_level: String,
    /// Emit JSON lines instead of plain text.
    pub json_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
        }
    }
}

impl LoggingConfig {
    /// Reads the configuration from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("QC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "warn".to_string()),

            json_logs: env::var("QC_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns `InvalidFilter` for a bad directive and `SubscriberInit` if a
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?;

    if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| LoggingError::SubscriberInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| LoggingError::SubscriberInit(e.to_string()))?;
    }

    tracing::debug!(level = %config.log_level, json = config.json_logs, "logging initialized");
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
