//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set
    pub filter: String,
    /// Include the event target in each line
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), with_target: true }
    }
}

impl From<&AppConfig> for LogConfig {
    fn from(config: &AppConfig) -> Self {
        Self { filter: config.log_filter.clone(), ..Default::default() }
    }
}

/// Install the global fmt subscriber
///
/// Returns `false` when a subscriber was already installed (tests, or a host
/// that sets up its own), in which case nothing changes.
pub fn init_tracing(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
        .try_init()
        .is_ok()
}
