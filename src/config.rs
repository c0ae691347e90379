//! Application configuration
//!
//! Values come from the process environment, with a `.env` file loaded first
//! when present. Anything unset falls back to the defaults of the selected
//! environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local backend on the developer network
    #[default]
    Development,
    /// Staging backend
    Staging,
    /// Production backend
    Production,
}

impl Environment {
    /// Backend URL used when `RUDIX_API_URL` is unset
    pub fn default_api_url(&self) -> &'static str {
        match self {
            Environment::Development => "http://192.168.1.100:3000",
            Environment::Staging => "https://staging-api.rudix.com",
            Environment::Production => "https://api.rudix.com",
        }
    }

    /// Log filter used when `RUDIX_LOG` is unset
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            Environment::Development => "debug",
            Environment::Staging | Environment::Production => "info",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::Invalid { var: "RUDIX_ENV", value: s.to_string() }),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used
    #[error("Invalid value for {var}: {value:?}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
}

/// Application configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Backend base URL
    pub api_url: String,
    /// Directory for the key-value store and trip history
    pub data_dir: PathBuf,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Default tracing filter directive
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

impl AppConfig {
    /// Defaults for an environment
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            api_url: environment.default_api_url().to_string(),
            data_dir: PathBuf::from("rudix_data"),
            request_timeout: Duration::from_secs(30),
            log_filter: environment.default_log_filter().to_string(),
        }
    }

    /// Load configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("RUDIX_ENV") {
            Some(value) => value.parse()?,
            None => Environment::default(),
        };
        let mut config = Self::new(environment);

        if let Some(url) = lookup("RUDIX_API_URL") {
            config.api_url = url;
        }
        if let Some(dir) = lookup("RUDIX_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("RUDIX_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "RUDIX_REQUEST_TIMEOUT_SECS",
                value: secs.clone(),
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(filter) = lookup("RUDIX_LOG") {
            config.log_filter = filter;
        }

        Ok(config)
    }

    /// Set the backend URL
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the data directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the HTTP request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the default log filter
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Path of the sled key-value store
    pub fn kv_path(&self) -> PathBuf {
        self.data_dir.join("kv")
    }

    /// Path of the trip history file
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("trip_history.json")
    }
}
