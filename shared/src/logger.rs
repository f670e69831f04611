//! `tracing` initialization shared by the binary and by integration tests.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("tracing init error: {0}")]
    TryInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Initializes a global `tracing` subscriber.
///
/// `console_level` overrides `RUST_LOG` when set (e.g. from `runtime.console_level`
/// in the pipeline config); otherwise falls back to `info`.
pub fn init_logger(console_level: Option<&str>) -> Result<(), LoggerError> {
    let filter = match console_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt().with_env_filter(filter).with_target(false).try_init()?;
    Ok(())
}
