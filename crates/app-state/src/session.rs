//! Session token store
//!
//! [`SessionStore`] is the only component that touches the secure storage
//! collaborator. Every call takes an async mutex so that operations from one
//! caller complete in the order they were issued, and a `delete_token` that
//! has resolved can never be overtaken by an earlier `get_token`.

use async_trait::async_trait;
use ride_client::TokenProvider;
use std::sync::Arc;
use storage::{SecureStorage, SecureStorageError};
use tokio::sync::Mutex;

/// Secure storage key holding the session token
pub const TOKEN_KEY: &str = "userToken";

/// Session store errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The secure storage collaborator failed
    #[error("Storage failure: {0}")]
    StorageFailure(#[from] SecureStorageError),
}

impl SessionError {
    /// Text shown to the user when the session cannot be used
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::StorageFailure(_) => "Sesión no disponible, inicia sesión de nuevo",
        }
    }
}

/// Result type for session store operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Owner of the authentication token lifecycle
///
/// A delete that the keystore refuses still revokes the token for this
/// process: later reads report no session until a new token is saved.
pub struct SessionStore {
    storage: Arc<dyn SecureStorage>,
    revoked: Mutex<bool>,
}

impl SessionStore {
    /// Create a store over a secure storage collaborator
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self { storage, revoked: Mutex::new(false) }
    }

    /// Persist the token, replacing any previous one
    pub async fn save_token(&self, token: &str) -> Result<()> {
        let mut revoked = self.revoked.lock().await;
        self.storage.set_secure_item(TOKEN_KEY, token).await.map_err(|e| {
            tracing::warn!(error = %e, "failed to save session token");
            SessionError::from(e)
        })?;
        *revoked = false;
        Ok(())
    }

    /// Read the token; `Ok(None)` when no session is stored or it was revoked
    pub async fn get_token(&self) -> Result<Option<String>> {
        let revoked = self.revoked.lock().await;
        if *revoked {
            return Ok(None);
        }
        self.storage.get_secure_item(TOKEN_KEY).await.map_err(|e| {
            tracing::warn!(error = %e, "failed to read session token");
            SessionError::from(e)
        })
    }

    /// Delete the token; deleting an absent token succeeds
    ///
    /// The token is revoked in memory before the keystore is asked, so it
    /// stays unreadable even when the delete fails.
    pub async fn delete_token(&self) -> Result<()> {
        let mut revoked = self.revoked.lock().await;
        *revoked = true;
        self.storage.remove_secure_item(TOKEN_KEY).await.map_err(|e| {
            tracing::warn!(error = %e, "failed to delete session token, revoked in memory");
            SessionError::from(e)
        })?;
        *revoked = false;
        Ok(())
    }

    /// Whether a failed delete left a revoked token behind in the keystore
    pub async fn is_revoked(&self) -> bool {
        *self.revoked.lock().await
    }
}

#[async_trait]
impl TokenProvider for SessionStore {
    async fn token(&self) -> Option<String> {
        // A failed read is treated as no session
        self.get_token().await.ok().flatten()
    }
}
