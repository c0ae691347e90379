//! Current-trip container
//!
//! Holds at most one active [`Trip`]. Writes replace the whole record; there
//! is no merging. Screens either read on demand or hold a
//! [`watch::Receiver`] and are woken on every replacement.

use parking_lot::RwLock;
use ride_client::{RidePhase, Trip};
use tokio::sync::watch;

/// Observable container for the trip in progress
pub struct TripStore {
    current: RwLock<Option<Trip>>,
    tx: watch::Sender<Option<Trip>>,
}

impl Default for TripStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TripStore {
    /// Create an empty container
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { current: RwLock::new(None), tx }
    }

    /// Copy of the current trip, if any
    pub fn get_current(&self) -> Option<Trip> {
        self.current.read().clone()
    }

    /// Phase of the current trip (`Idle` when the container is empty)
    pub fn phase(&self) -> RidePhase {
        self.current.read().as_ref().map_or(RidePhase::Idle, |trip| trip.phase)
    }

    /// Replace the current trip; last writer wins
    pub fn set_current(&self, trip: Option<Trip>) {
        let mut current = self.current.write();
        *current = trip;
        self.tx.send_replace(current.clone());
    }

    /// Read, modify and write back under one lock
    ///
    /// Observers are only notified when `f` returns `Ok` and the trip
    /// actually changed.
    pub fn update<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Option<Trip>) -> Result<T, E>,
    {
        let mut current = self.current.write();
        let mut next = current.clone();
        let out = f(&mut next)?;
        if next != *current {
            *current = next;
            self.tx.send_replace(current.clone());
        }
        Ok(out)
    }

    /// Empty the container
    pub fn clear(&self) {
        self.set_current(None);
    }

    /// Subscribe to replacements
    pub fn subscribe(&self) -> watch::Receiver<Option<Trip>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ride_client::UserId;

    fn trip() -> Trip {
        Trip::new(UserId::new("u-1"), Some("Centro".to_string()))
    }

    #[test]
    fn test_empty_by_default() {
        let store = TripStore::new();
        assert!(store.get_current().is_none());
        assert_eq!(store.phase(), RidePhase::Idle);
    }

    #[test]
    fn test_set_then_get_returns_written_value() {
        let store = TripStore::new();
        let trip = trip();

        store.set_current(Some(trip.clone()));
        assert_eq!(store.get_current(), Some(trip));
        assert_eq!(store.phase(), RidePhase::Searching);

        store.clear();
        assert!(store.get_current().is_none());
    }

    #[test]
    fn test_failed_update_leaves_state() {
        let store = TripStore::new();
        let trip = trip();
        store.set_current(Some(trip.clone()));

        let result: Result<(), &str> = store.update(|current| {
            if let Some(t) = current.as_mut() {
                t.phase = RidePhase::Tracking;
            }
            Err("rejected")
        });

        assert!(result.is_err());
        assert_eq!(store.get_current(), Some(trip));
    }

    #[tokio::test]
    async fn test_observers_see_replacements() {
        let store = TripStore::new();
        let mut rx = store.subscribe();
        assert!(rx.borrow().is_none());

        let trip = trip();
        store.set_current(Some(trip.clone()));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().map(|t| t.id()), Some(trip.id()));

        store
            .update::<_, _, ()>(|current| {
                *current = None;
                Ok(())
            })
            .unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[test]
    fn test_unchanged_update_does_not_wake_observers() {
        let store = TripStore::new();
        store.set_current(Some(trip()));
        let rx = store.subscribe();

        store.update::<_, _, ()>(|_| Ok(())).unwrap();
        assert!(!rx.has_changed().unwrap());

        store
            .update::<_, _, ()>(|current| {
                if let Some(t) = current.as_mut() {
                    t.phase = RidePhase::ServiceSelected;
                }
                Ok(())
            })
            .unwrap();
        assert!(rx.has_changed().unwrap());
    }
}
