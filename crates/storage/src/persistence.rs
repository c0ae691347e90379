//! Versioned file persistence
//!
//! A [`PersistedState`] keeps one serializable value in memory and mirrors it
//! to a JSON file wrapped in an envelope carrying a schema version and an md5
//! checksum. Writes go through a temp file and a rename so a crash never
//! leaves a half-written file behind.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Persistence error types
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// State not initialized
    #[error("State not initialized")]
    NotInitialized,

    /// Checksum did not match the stored data
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// Stored schema version differs from the expected one
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version
        expected: u32,
        /// Found version
        found: u32,
    },
}

/// Result type for persistence operations
pub type Result<T> = std::result::Result<T, PersistenceError>;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    checksum: String,
    data: T,
}

fn checksum<T: Serialize>(data: &T) -> Result<String> {
    let json = serde_json::to_string(data)?;
    Ok(format!("{:x}", md5::compute(json)))
}

/// Persistence configuration
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Path to the persisted file
    pub path: PathBuf,
    /// Current schema version
    pub version: u32,
    /// Discard unreadable files (corrupt or wrong version) instead of failing
    pub reset_on_error: bool,
}

impl PersistenceConfig {
    /// Create a configuration for the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), version: 1, reset_on_error: false }
    }

    /// Set schema version
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Start from the default value when the file cannot be read back
    pub fn reset_on_error(mut self, enabled: bool) -> Self {
        self.reset_on_error = enabled;
        self
    }
}

/// A value mirrored to a versioned JSON file
pub struct PersistedState<T> {
    config: PersistenceConfig,
    state: RwLock<Option<T>>,
}

impl<T> PersistedState<T>
where
    T: Serialize + DeserializeOwned + Clone + Default,
{
    /// Create an uninitialized state; call [`PersistedState::init`] before use
    pub fn new(config: PersistenceConfig) -> Self {
        Self { config, state: RwLock::new(None) }
    }

    /// Load the file, falling back to the default value when it does not exist
    pub async fn init(&self) -> Result<()> {
        let loaded = match self.load().await {
            Ok(data) => data,
            Err(PersistenceError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                T::default()
            }
            Err(e) if self.config.reset_on_error => {
                tracing::warn!(
                    path = %self.config.path.display(),
                    error = %e,
                    "discarding unreadable persisted state"
                );
                T::default()
            }
            Err(e) => return Err(e),
        };

        *self.state.write().await = Some(loaded);
        Ok(())
    }

    /// Get a copy of the current value
    pub async fn get(&self) -> Result<T> {
        self.state.read().await.clone().ok_or(PersistenceError::NotInitialized)
    }

    /// Mutate the value in place and persist it
    pub async fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut T),
    {
        let mut state = self.state.write().await;
        let current = state.as_mut().ok_or(PersistenceError::NotInitialized)?;
        f(current);
        self.write(current).await
    }

    /// Replace the value and persist it
    pub async fn set(&self, value: T) -> Result<()> {
        let mut state = self.state.write().await;
        self.write(&value).await?;
        *state = Some(value);
        Ok(())
    }

    /// Reset to the default value and delete the file
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        *state = Some(T::default());

        match fs::remove_file(&self.config.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self) -> Result<T> {
        let contents = fs::read_to_string(&self.config.path).await?;
        let envelope: Envelope<T> = serde_json::from_str(&contents)?;

        if envelope.version != self.config.version {
            return Err(PersistenceError::VersionMismatch {
                expected: self.config.version,
                found: envelope.version,
            });
        }

        let computed = checksum(&envelope.data)?;
        if computed != envelope.checksum {
            return Err(PersistenceError::Corruption(format!(
                "checksum mismatch: expected {}, got {}",
                envelope.checksum, computed
            )));
        }

        Ok(envelope.data)
    }

    async fn write(&self, data: &T) -> Result<()> {
        let envelope = Envelope {
            version: self.config.version,
            checksum: checksum(data)?,
            data,
        };
        let json = serde_json::to_string_pretty(&envelope)?;

        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.config.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.config.path).await?;
        Ok(())
    }
}
