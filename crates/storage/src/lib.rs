//! Storage layer for RuDix
//!
//! This crate provides the sled key-value store, the secure-storage seam the
//! session store is built on, and versioned file persistence.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod kv;
pub mod persistence;
pub mod secure;

pub use kv::{KvConfig, KvError, KvStore, ScopedKey};
pub use persistence::{PersistedState, PersistenceConfig, PersistenceError};
pub use secure::{KvSecureStorage, MemorySecureStorage, SecureStorage, SecureStorageError};
