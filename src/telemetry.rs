//! Tracing subscriber setup.
//!
//! The crate itself only emits `tracing` events; hosts that have no
//! subscriber of their own can install one with [`init_tracing`].

use tracing_subscriber::filter::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::ConfigError;

/// Build the filter for `level`, falling back to `info` on a bad directive.
#[must_use]
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global fmt subscriber writing to stderr.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if a global subscriber is already
/// installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.level))
        .with_writer(std::io::stderr)
        .with_ansi(false);

    let result = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| ConfigError::InvalidValue {
        var: "LOG_FORMAT".into(),
        reason: format!("tracing already initialised: {e}"),
    })
}
