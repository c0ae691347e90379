//! Client state for RuDix
//!
//! This crate owns the state that outlives any single screen: the session
//! token store, the current-trip container every ride screen observes, and
//! the persisted history of finished trips.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod history;
pub mod session;
pub mod trip;

pub use history::{HistoryError, TripHistory, MAX_HISTORY};
pub use session::{SessionError, SessionStore, TOKEN_KEY};
pub use trip::TripStore;
