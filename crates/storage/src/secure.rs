//! Secure key-value storage
//!
//! The platform keystore is an external collaborator; the client core only
//! depends on the three operations of [`SecureStorage`]. Two implementations
//! ship here: [`KvSecureStorage`] keeps items in the sled store under the
//! `secure` scope, and [`MemorySecureStorage`] keeps them in process memory
//! with switchable failure injection for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::kv::{KvError, KvStore};

/// Secure storage error types
#[derive(Debug, Error)]
pub enum SecureStorageError {
    /// The keystore refused the operation (locked, missing, permission denied)
    #[error("Secure storage unavailable: {0}")]
    Unavailable(String),

    /// Underlying key-value store error
    #[error("Key-value store error: {0}")]
    Kv(#[from] KvError),
}

/// Result type for secure storage operations
pub type Result<T> = std::result::Result<T, SecureStorageError>;

/// Opaque secure key-value collaborator
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait SecureStorage: Send + Sync {
    /// Store a value under a key, replacing any previous value
    async fn set_secure_item(&self, key: &str, value: &str) -> Result<()>;

    /// Read a value; `Ok(None)` when the key is absent
    async fn get_secure_item(&self, key: &str) -> Result<Option<String>>;

    /// Remove a value; removing an absent key succeeds
    async fn remove_secure_item(&self, key: &str) -> Result<()>;
}

const SECURE_SCOPE: &str = "secure";

/// [`SecureStorage`] kept in the sled store
///
/// Every write is flushed before it resolves, so a completed `set` or `remove`
/// survives a crash.
#[derive(Clone)]
pub struct KvSecureStorage {
    kv: KvStore,
}

impl KvSecureStorage {
    /// Create secure storage on top of a key-value store
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl SecureStorage for KvSecureStorage {
    async fn set_secure_item(&self, key: &str, value: &str) -> Result<()> {
        self.kv.set_scoped(&[SECURE_SCOPE, key], value)?;
        self.kv.flush().await?;
        Ok(())
    }

    async fn get_secure_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.kv.get_scoped(&[SECURE_SCOPE, key])?)
    }

    async fn remove_secure_item(&self, key: &str) -> Result<()> {
        if self.kv.remove_scoped(&[SECURE_SCOPE, key])? {
            self.kv.flush().await?;
        }
        Ok(())
    }
}

/// In-process [`SecureStorage`]
#[derive(Debug, Default)]
pub struct MemorySecureStorage {
    items: RwLock<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemorySecureStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent reads fail with [`SecureStorageError::Unavailable`]
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes and removals fail with [`SecureStorageError::Unavailable`]
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored items
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Whether no items are stored
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    fn check(&self, flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(SecureStorageError::Unavailable("keystore unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SecureStorage for MemorySecureStorage {
    async fn set_secure_item(&self, key: &str, value: &str) -> Result<()> {
        self.check(&self.fail_writes)?;
        self.items.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_secure_item(&self, key: &str) -> Result<Option<String>> {
        self.check(&self.fail_reads)?;
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn remove_secure_item(&self, key: &str) -> Result<()> {
        self.check(&self.fail_writes)?;
        self.items.write().await.remove(key);
        Ok(())
    }
}
