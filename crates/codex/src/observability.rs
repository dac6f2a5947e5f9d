//! Tracing subscriber setup for the binary.

use crate::LoggingConfig;
use codex_error::{CodexResult, ConfigError};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level unless `verbose`
/// forces `debug`. Log lines go to stderr so command output on stdout stays
/// machine-readable.
///
/// # Errors
///
/// `ConfigError` for an invalid filter directive or when a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> CodexResult<()> {
    let env_filter = if verbose {
        EnvFilter::try_new("debug")
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(config.level()))
    }
    .map_err(|e| ConfigError::new(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = if *config.json() {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ConfigError::new(format!("Failed to initialise logging: {}", e)))?;
    Ok(())
}
