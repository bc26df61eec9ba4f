//! Log output for the host.
//!
//! Library crates log through `log`; those records are forwarded into
//! `tracing` and printed by a `tracing-subscriber` fmt layer.
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Logger initialisation failed, usually because a logger is already set.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The `log` bridge could not be installed.
    #[error("could not install log bridge: {0}")]
    Bridge(#[from] tracing_log::log_tracer::SetLoggerError),
    /// The global subscriber could not be installed.
    #[error("could not install subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Builds the filter, letting `RUST_LOG` override `default_filter`.
#[must_use]
pub fn filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs the global logger.
pub fn init(default_filter: &str) -> Result<(), LoggerError> {
    tracing_log::LogTracer::init()?;

    let subscriber = tracing_subscriber::registry()
        .with(filter(default_filter))
        .with(fmt::layer().with_target(true));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
