//! Driver shift state machine
//!
//! `offline → available → en-route → on-trip → completed → available`.
//! A driver holds at most one trip at a time, and trip ids come from the same
//! space as the passenger side, so a closed trip can never be accepted again.
//! Going online takes a [`DriverGrant`], so only a session acting as a driver
//! can start a shift.

use parking_lot::Mutex;
use ride_client::{TripId, UserId};

use crate::auth::{AuthError, DriverGrant};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Driver-facing phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverPhase {
    /// Not accepting requests
    #[default]
    Offline,
    /// Online and waiting for a request
    Available,
    /// Heading to the pickup point
    EnRoute,
    /// Passenger on board
    OnTrip,
    /// Trip finished, summary pending
    Completed,
}

impl DriverPhase {
    /// Kebab-case name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverPhase::Offline => "offline",
            DriverPhase::Available => "available",
            DriverPhase::EnRoute => "en-route",
            DriverPhase::OnTrip => "on-trip",
            DriverPhase::Completed => "completed",
        }
    }

    /// Whether the driver is currently bound to a trip
    pub fn has_trip(&self) -> bool {
        matches!(self, DriverPhase::EnRoute | DriverPhase::OnTrip | DriverPhase::Completed)
    }
}

impl fmt::Display for DriverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Driver shift errors
#[derive(Debug, Error)]
pub enum ShiftError {
    /// The current phase does not allow the attempted move
    #[error("Invalid transition from {from} to {attempted}")]
    InvalidTransition {
        /// Phase the shift was in
        from: DriverPhase,
        /// Phase the caller tried to reach
        attempted: DriverPhase,
    },

    /// The trip was already closed by this driver
    #[error("Trip already closed: {0}")]
    TripClosed(TripId),

    /// The session may not drive
    #[error("Shift not permitted: {0}")]
    NotPermitted(#[from] AuthError),
}

/// Result type for driver shift operations
pub type Result<T> = std::result::Result<T, ShiftError>;

#[derive(Debug, Default)]
struct ShiftState {
    phase: DriverPhase,
    driver: Option<UserId>,
    trip: Option<TripId>,
    closed: HashSet<TripId>,
}

impl ShiftState {
    fn require(&self, required: DriverPhase, attempted: DriverPhase) -> Result<()> {
        if self.phase == required {
            Ok(())
        } else {
            tracing::error!(from = %self.phase, %attempted, "invalid driver transition");
            Err(ShiftError::InvalidTransition { from: self.phase, attempted })
        }
    }

    fn move_to(&mut self, phase: DriverPhase) {
        tracing::debug!(from = %self.phase, to = %phase, trip_id = ?self.trip, "driver phase");
        self.phase = phase;
    }
}

/// Driver-side shift machine
#[derive(Debug, Default)]
pub struct DriverShift {
    state: Mutex<ShiftState>,
}

impl DriverShift {
    /// Create an offline shift
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase
    pub fn phase(&self) -> DriverPhase {
        self.state.lock().phase
    }

    /// Driver on shift, if online
    pub fn driver(&self) -> Option<UserId> {
        self.state.lock().driver.clone()
    }

    /// Trip the driver is bound to, if any
    pub fn current_trip(&self) -> Option<TripId> {
        self.state.lock().trip
    }

    /// Number of trips closed in this shift
    pub fn closed_count(&self) -> usize {
        self.state.lock().closed.len()
    }

    /// offline → available
    pub fn go_online(&self, grant: &DriverGrant) -> Result<()> {
        let mut state = self.state.lock();
        state.require(DriverPhase::Offline, DriverPhase::Available)?;
        state.driver = Some(grant.user_id().clone());
        state.move_to(DriverPhase::Available);
        Ok(())
    }

    /// available → offline
    pub fn go_offline(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.require(DriverPhase::Available, DriverPhase::Offline)?;
        state.driver = None;
        state.move_to(DriverPhase::Offline);
        Ok(())
    }

    /// End the shift from any phase
    ///
    /// A trip still bound to the driver is abandoned and joins the closed set,
    /// so it cannot be picked up again in this shift's lifetime. Returns the
    /// abandoned trip, if any.
    pub fn end_shift(&self) -> Option<TripId> {
        let mut state = self.state.lock();
        let abandoned = state.trip.take();
        if let Some(trip_id) = abandoned {
            tracing::warn!(%trip_id, phase = %state.phase, "trip abandoned at end of shift");
            state.closed.insert(trip_id);
        }
        state.driver = None;
        if state.phase != DriverPhase::Offline {
            state.move_to(DriverPhase::Offline);
        }
        abandoned
    }

    /// available → en-route, binding the trip
    pub fn accept_request(&self, trip_id: TripId) -> Result<()> {
        let mut state = self.state.lock();
        state.require(DriverPhase::Available, DriverPhase::EnRoute)?;
        if state.closed.contains(&trip_id) {
            tracing::error!(%trip_id, "closed trip offered again");
            return Err(ShiftError::TripClosed(trip_id));
        }
        state.trip = Some(trip_id);
        state.move_to(DriverPhase::EnRoute);
        Ok(())
    }

    /// en-route → on-trip
    pub fn start_trip(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.require(DriverPhase::EnRoute, DriverPhase::OnTrip)?;
        state.move_to(DriverPhase::OnTrip);
        Ok(())
    }

    /// on-trip → completed
    pub fn finish_trip(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.require(DriverPhase::OnTrip, DriverPhase::Completed)?;
        state.move_to(DriverPhase::Completed);
        Ok(())
    }

    /// completed → available, releasing the trip
    ///
    /// Returns the id of the closed trip.
    pub fn close_trip(&self) -> Result<TripId> {
        let mut state = self.state.lock();
        state.require(DriverPhase::Completed, DriverPhase::Available)?;
        let trip_id = match state.trip.take() {
            Some(id) => id,
            None => {
                return Err(ShiftError::InvalidTransition {
                    from: DriverPhase::Completed,
                    attempted: DriverPhase::Available,
                })
            }
        };
        state.closed.insert(trip_id);
        state.move_to(DriverPhase::Available);
        Ok(trip_id)
    }
}
