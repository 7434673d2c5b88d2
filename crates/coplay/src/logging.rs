//! Log subscriber setup.
//!
//! Coplay's crates only emit `tracing` events; nothing is printed until
//! the application installs a subscriber. [`init`] installs the usual one:
//! an `EnvFilter` that honours `RUST_LOG` and falls back to
//! [`LogConfig::level`], plus a human-readable or JSON formatter.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::LogInitError;

/// Logging options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `"info"` or
    /// `"coplay_session=debug,info"`.
    pub level: String,

    /// Emit one JSON object per event instead of formatted lines.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Installs the global subscriber.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<(), LogInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(fmt::layer().json().with_thread_names(true))
            .try_init()
            .map_err(LogInitError::new)?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_names(true))
            .try_init()
            .map_err(LogInitError::new)?;
    }

    tracing::info!(level = %config.level, json = config.json, "logging initialized");
    Ok(())
}
