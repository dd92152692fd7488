//! Global tracing subscriber setup.
//!
//! Library code emits through both `log` and `tracing`; the `LogTracer`
//! bridge forwards `log` records into the subscriber installed here. Output
//! goes to stderr so it never mixes with command output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::ConfigError;

/// Builds the filter from `RUST_LOG`, falling back to the configured level.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| ConfigError::Logging(format!("invalid level '{}': {}", config.level, e)))
}

/// Installs the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed, in which
/// case nothing changes.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let filter = build_filter(config)?;

    let json_layer = config.json.then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
    });
    let plain_layer =
        (!config.json).then(|| fmt::layer().with_target(true).with_writer(std::io::stderr));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer);

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Global subscriber already installed, keeping it");
        return Ok(false);
    }

    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::debug!(error = %e, "log bridge already installed");
    }

    Ok(true)
}
