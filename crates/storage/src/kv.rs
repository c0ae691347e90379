//! Key-value store backed by sled
//!
//! Values are stored as JSON under scoped keys: `["secure", "userToken"]` is
//! written as `secure:userToken`. Scope parts may not be empty and may not
//! contain the separator, so two subsystems can never address the same entry.

use serde::{de::DeserializeOwned, Serialize};
use sled::Db;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Key-value store error types
#[derive(Debug, Error)]
pub enum KvError {
    /// Sled database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Stored bytes are not the expected JSON value
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Scope list cannot form a key
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for key-value operations
pub type Result<T> = std::result::Result<T, KvError>;

const SEPARATOR: char = ':';

/// A validated `scope:scope:...` key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedKey(String);

impl ScopedKey {
    /// Join scope parts into a key
    pub fn new(parts: &[&str]) -> Result<Self> {
        if parts.is_empty() {
            return Err(KvError::InvalidKey("empty scope list".to_string()));
        }
        if let Some(bad) = parts.iter().find(|p| p.is_empty() || p.contains(SEPARATOR)) {
            return Err(KvError::InvalidKey(format!("invalid scope part {bad:?}")));
        }
        Ok(Self(parts.join(":")))
    }

    /// Key as stored in the database
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-disk location and flush policy
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Database directory
    pub path: PathBuf,
    /// Background flush interval in milliseconds; `None` flushes only on request
    ///
    /// A background flusher holds the database until its thread winds down,
    /// so a store reopened right after a drop can find the lock still taken.
    pub flush_every_ms: Option<u64>,
}

impl KvConfig {
    /// Create a configuration for the given database directory
    ///
    /// Writes reach disk only through [`KvStore::flush`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), flush_every_ms: None }
    }

    /// Set the background flush interval
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }
}

/// JSON key-value store
#[derive(Clone)]
pub struct KvStore {
    db: Arc<Db>,
}

impl KvStore {
    /// Open (or create) a store on disk
    pub fn new(config: KvConfig) -> Result<Self> {
        let db = sled::Config::new()
            .path(&config.path)
            .use_compression(true)
            .flush_every_ms(config.flush_every_ms)
            .open()?;

        tracing::debug!(path = %config.path.display(), "opened key-value store");
        Ok(Self { db: Arc::new(db) })
    }

    /// Temporary store discarded on drop
    pub fn in_memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Read the value stored under `scopes`
    pub fn get_scoped<T>(&self, scopes: &[&str]) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let key = ScopedKey::new(scopes)?;
        match self.db.get(key.as_str())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Store a value under `scopes`, replacing any previous one
    pub fn set_scoped<T>(&self, scopes: &[&str], value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = ScopedKey::new(scopes)?;
        self.db.insert(key.as_str(), serde_json::to_vec(value)?)?;
        Ok(())
    }

    /// Remove the value under `scopes`, returning whether it existed
    pub fn remove_scoped(&self, scopes: &[&str]) -> Result<bool> {
        let key = ScopedKey::new(scopes)?;
        Ok(self.db.remove(key.as_str())?.is_some())
    }

    /// Whether a raw key is present
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.db.contains_key(key)?)
    }

    /// Wait until pending writes reach disk
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scoped_round_trip() {
        let kv = KvStore::in_memory().unwrap();
        kv.set_scoped(&["secure", "userToken"], "abc").unwrap();

        assert!(kv.contains("secure:userToken").unwrap());
        let value: Option<String> = kv.get_scoped(&["secure", "userToken"]).unwrap();
        assert_eq!(value.as_deref(), Some("abc"));

        assert!(kv.remove_scoped(&["secure", "userToken"]).unwrap());
        assert!(!kv.remove_scoped(&["secure", "userToken"]).unwrap());
    }

    #[test]
    fn test_invalid_scope_parts_rejected() {
        assert!(matches!(ScopedKey::new(&[]), Err(KvError::InvalidKey(_))));
        assert!(matches!(ScopedKey::new(&["a", ""]), Err(KvError::InvalidKey(_))));
        assert!(matches!(ScopedKey::new(&["a:b"]), Err(KvError::InvalidKey(_))));
        assert_eq!(ScopedKey::new(&["a", "b"]).unwrap().to_string(), "a:b");
    }

    #[test]
    fn test_wrong_type_is_a_serialization_error() {
        let kv = KvStore::in_memory().unwrap();
        kv.set_scoped(&["n"], &42u32).unwrap();

        let read: Result<Option<Vec<String>>> = kv.get_scoped(&["n"]);
        assert!(matches!(read, Err(KvError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kv");

        {
            let kv = KvStore::new(KvConfig::new(&path).flush_every_ms(None)).unwrap();
            kv.set_scoped(&["trip"], &42u32).unwrap();
            kv.flush().await.unwrap();
        }

        let kv = KvStore::new(KvConfig::new(&path).flush_every_ms(None)).unwrap();
        assert_eq!(kv.get_scoped::<u32>(&["trip"]).unwrap(), Some(42));
    }
}
