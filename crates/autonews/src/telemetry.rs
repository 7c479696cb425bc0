//! Process-wide logging setup.
//!
//! Library code logs through both the `log` facade and `tracing`; this
//! installs a single `tracing` subscriber and routes `log` records into it.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Filter used when neither `RUST_LOG` nor the caller provides one.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Logging is already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Builds the filter: `RUST_LOG` wins, then `fallback`, then `info`.
pub fn build_filter(fallback: Option<&str>) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directives = fallback.unwrap_or(DEFAULT_LOG_FILTER);
    EnvFilter::try_new(directives).map_err(|e| LoggingError::InvalidFilter {
        filter: directives.to_string(),
        reason: e.to_string(),
    })
}

/// Installs the global subscriber. Call once at startup.
///
/// `json` switches stderr output to one JSON object per line.
pub fn init_logging(filter: Option<&str>, json: bool) -> Result<(), LoggingError> {
    let filter = build_filter(filter)?;

    let output = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let subscriber = tracing_subscriber::registry().with(output).with(filter);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(())
}
