//! Logging setup for hosts embedding the CCTX core

use crate::config::LoggingConfig;
use crate::error::{CrosschainError, CrosschainResult};

/// Install the global tracing subscriber
///
/// RUST_LOG takes precedence over the configured filter. Fails if a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> CrosschainResult<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| CrosschainError::Config(format!("invalid log filter: {}", e)))?;

    let json_layer = config.json.then(|| fmt::layer().json().with_target(true));
    let text_layer = (!config.json).then(|| fmt::layer().with_target(true).with_thread_ids(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| CrosschainError::Config(format!("failed to install subscriber: {}", e)))
}
