//! Finished-trip history
//!
//! Trips leave the current-trip container when they are rated or cancelled
//! and land here, most recent first. Only history is written to disk; the
//! trip in progress never is.

use ride_client::{Trip, TripId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use storage::{PersistedState, PersistenceConfig, PersistenceError};

/// Maximum number of archived trips kept
pub const MAX_HISTORY: usize = 50;

const HISTORY_VERSION: u32 = 1;

/// History errors
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// Persistence failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HistoryFile {
    trips: Vec<Trip>,
}

/// Persisted list of archived trips
pub struct TripHistory {
    state: PersistedState<HistoryFile>,
}

impl TripHistory {
    /// Open the history file, starting empty if it is missing or unreadable
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = PersistenceConfig::new(path.as_ref())
            .version(HISTORY_VERSION)
            .reset_on_error(true);
        let state = PersistedState::new(config);
        state.init().await?;
        Ok(Self { state })
    }

    /// Archive a trip; an entry with the same id is replaced
    pub async fn add(&self, trip: Trip) -> Result<()> {
        let id = trip.id();
        self.state
            .update(|file| {
                file.trips.retain(|t| t.id() != id);
                file.trips.insert(0, trip);
                file.trips.truncate(MAX_HISTORY);
            })
            .await?;
        tracing::debug!(trip_id = %id, "archived trip");
        Ok(())
    }

    /// Look up an archived trip
    pub async fn get(&self, id: &TripId) -> Result<Option<Trip>> {
        let file = self.state.get().await?;
        Ok(file.trips.into_iter().find(|t| t.id() == *id))
    }

    /// All archived trips, most recent first
    pub async fn list(&self) -> Result<Vec<Trip>> {
        Ok(self.state.get().await?.trips)
    }

    /// Number of archived trips
    pub async fn len(&self) -> Result<usize> {
        Ok(self.state.get().await?.trips.len())
    }

    /// Whether nothing has been archived
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Forget every archived trip
    pub async fn clear(&self) -> Result<()> {
        self.state.clear().await?;
        Ok(())
    }
}
