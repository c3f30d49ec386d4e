//! Tracing Setup
//!
//! Console logging through `tracing-subscriber`.
//!
//! # Configuration
//!
//! - `RUST_LOG`: filter directives; overrides `logging.level`
//! - `logging.format`: `json` for one JSON object per line, `pretty` otherwise
//!
//! # Usage
//!
//! ```rust,ignore
//! use paper_engine::telemetry::init_telemetry;
//!
//! init_telemetry(&config.logging)?;
//! ```

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Telemetry initialization error.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter could not be parsed.
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// Filter text.
        filter: String,
        /// Parser message.
        message: String,
    },

    /// A global subscriber is already installed.
    #[error("Tracing subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Build the filter: `RUST_LOG` wins, then the configured level.
///
/// # Errors
///
/// Returns `InvalidFilter` if the configured level cannot be parsed.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| TelemetryError::InvalidFilter {
        filter: config.level.clone(),
        message: e.to_string(),
    })
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns error if the filter is invalid or a subscriber is already set.
pub fn init_telemetry(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = if config.is_json() {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(level = %config.level, format = %config.format, "Tracing initialized");
    Ok(())
}
