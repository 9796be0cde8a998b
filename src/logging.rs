use negotiation_config::{LogFormat, LoggingConfig};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Tracing error types
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("tracing initialization error: {0}")]
    InitError(String),
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TracingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.level)?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .json(),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_level(true).pretty())
            .try_init(),
    };

    result.map_err(|e| TracingError::InitError(e.to_string()))?;

    info!(level = %config.level, format = ?config.format, "tracing initialized");
    Ok(())
}

/// Filter for the configured level, e.g. `info` or `warn,negotiation_manager=debug`
pub fn level_filter(level: &str) -> Result<EnvFilter, TracingError> {
    EnvFilter::try_new(level).map_err(|e| TracingError::InvalidFilter {
        filter: level.to_string(),
        reason: e.to_string(),
    })
}
