//! Structured logging setup
//!
//! Diagnostics go to stderr through `tracing`; stdout is reserved for the
//! segmentation report so it can be piped. `RUST_LOG` overrides the filter
//! passed on the command line.

use std::sync::OnceLock;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Error type for logging initialization
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,

    #[error("invalid log filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the filter from `RUST_LOG` if set, else from `default_filter`
pub fn build_filter(default_filter: &str) -> Result<EnvFilter, LogError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_filter).map_err(|source| LogError::InvalidFilter {
        filter: default_filter.to_string(),
        source,
    })
}

/// Install the global subscriber; call once at startup
pub fn init_logging(default_filter: &str) -> Result<(), LogError> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    let filter = build_filter(default_filter)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish()
        .try_init()?;

    let _ = LOGGING_INITIALIZED.set(());
    Ok(())
}
