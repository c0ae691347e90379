//! Passenger ride lifecycle
//!
//! A ride moves through `idle → searching → service-selected → tracking →
//! rating → idle`. Every transition is a read-check-write against the
//! [`TripStore`]: a move that does not start from the phase it requires fails
//! with [`RideError::InvalidTransition`] and leaves the container untouched.
//!
//! The machine never talks to the backend on its own. Callers decide when to
//! pull driver and completion reports ([`RideLifecycle::sync_driver`],
//! [`RideLifecycle::sync_completion`]) or to reconcile local state with the
//! server copy ([`RideLifecycle::force_refresh`]).

use app_state::TripStore;
use ride_client::{
    DriverAssignment, Rating, RidePhase, ServiceTier, Trip, TripDelivery, TripId, TripProgress,
    TripStatus,
};
use std::sync::Arc;
use thiserror::Error;

use crate::auth::{AuthError, PassengerGrant};

/// Ride lifecycle errors
#[derive(Debug, Error)]
pub enum RideError {
    /// The current phase does not allow the attempted move
    #[error("Invalid transition from {from} to {attempted}")]
    InvalidTransition {
        /// Phase the container was in
        from: RidePhase,
        /// Phase the caller tried to reach
        attempted: RidePhase,
    },

    /// Local trip state disagrees with the trip-delivery source of truth
    #[error("Stale trip {trip_id}: local phase {local}, remote phase {remote:?}")]
    StaleTripReference {
        /// Trip held locally
        trip_id: TripId,
        /// Phase held locally
        local: RidePhase,
        /// Phase the server reported (`None` when the report named another trip)
        remote: Option<RidePhase>,
    },

    /// The trip-delivery collaborator failed
    #[error("Trip delivery error: {0}")]
    Delivery(#[from] ride_client::Error),

    /// The session may not enter the ride flow
    #[error("Ride flow not permitted: {0}")]
    NotPermitted(#[from] AuthError),
}

impl RideError {
    /// Whether the error came from a screen asking for an illegal move
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, RideError::InvalidTransition { .. })
    }
}

/// Result type for ride lifecycle operations
pub type Result<T> = std::result::Result<T, RideError>;

fn invalid(from: RidePhase, attempted: RidePhase) -> RideError {
    tracing::error!(%from, %attempted, "invalid ride transition");
    RideError::InvalidTransition { from, attempted }
}

fn stale(trip: &Trip, remote: Option<RidePhase>) -> RideError {
    tracing::warn!(trip_id = %trip.id(), local = %trip.phase, ?remote, "stale trip reference");
    RideError::StaleTripReference { trip_id: trip.id(), local: trip.phase, remote }
}

/// Borrow the current trip, requiring it to be in `required`
fn expect_phase(
    current: &mut Option<Trip>,
    required: RidePhase,
    attempted: RidePhase,
) -> Result<&mut Trip> {
    let phase = current.as_ref().map_or(RidePhase::Idle, |trip| trip.phase);
    match current {
        Some(trip) if phase == required => Ok(trip),
        _ => Err(invalid(phase, attempted)),
    }
}

enum Refresh {
    Untracked,
    Gone,
    Replaced(Trip),
    Diverged(RideError),
}

/// Passenger-side ride state machine over the shared trip container
pub struct RideLifecycle {
    trips: Arc<TripStore>,
    delivery: Arc<dyn TripDelivery>,
}

impl RideLifecycle {
    /// Create a lifecycle over a trip container and a trip-delivery collaborator
    pub fn new(trips: Arc<TripStore>, delivery: Arc<dyn TripDelivery>) -> Self {
        Self { trips, delivery }
    }

    /// The trip container this machine writes to
    pub fn trips(&self) -> &Arc<TripStore> {
        &self.trips
    }

    /// Current phase (`Idle` when no trip is held)
    pub fn phase(&self) -> RidePhase {
        self.trips.phase()
    }

    /// idle → searching: create a trip with a fresh identity
    ///
    /// Only a session acting as a passenger can produce the grant.
    pub fn request_ride(
        &self,
        rider: &PassengerGrant,
        destination: Option<String>,
    ) -> Result<Trip> {
        let trip = self.trips.update::<_, _, RideError>(|current| {
            if let Some(existing) = current {
                return Err(invalid(existing.phase, RidePhase::Searching));
            }
            let trip = Trip::new(rider.user_id().clone(), destination);
            *current = Some(trip.clone());
            Ok(trip)
        })?;

        tracing::debug!(trip_id = %trip.id(), "ride requested");
        Ok(trip)
    }

    /// searching → service-selected
    pub fn select_service(&self, tier: ServiceTier) -> Result<Trip> {
        self.trips.update(|current| {
            let trip =
                expect_phase(current, RidePhase::Searching, RidePhase::ServiceSelected)?;
            trip.service = Some(tier);
            trip.phase = RidePhase::ServiceSelected;
            tracing::debug!(trip_id = %trip.id(), service = ?tier, "service selected");
            Ok(trip.clone())
        })
    }

    /// service-selected → tracking, once a driver has been matched
    pub fn begin_tracking(&self, assignment: &DriverAssignment) -> Result<Trip> {
        self.trips.update(|current| {
            let trip =
                expect_phase(current, RidePhase::ServiceSelected, RidePhase::Tracking)?;
            if trip.id() != assignment.trip_id {
                return Err(stale(trip, None));
            }
            let driver = assignment
                .driver
                .clone()
                .ok_or_else(|| invalid(RidePhase::ServiceSelected, RidePhase::Tracking))?;

            tracing::debug!(trip_id = %trip.id(), driver_id = %driver.id, "driver assigned");
            trip.driver = Some(driver);
            trip.phase = RidePhase::Tracking;
            Ok(trip.clone())
        })
    }

    /// tracking → rating, once trip delivery reports the ride complete
    pub fn complete_ride(&self, progress: &TripProgress) -> Result<Trip> {
        self.trips.update(|current| {
            let trip = expect_phase(current, RidePhase::Tracking, RidePhase::Rating)?;
            if trip.id() != progress.trip_id {
                return Err(stale(trip, None));
            }
            if !progress.completed {
                return Err(invalid(RidePhase::Tracking, RidePhase::Rating));
            }

            trip.phase = RidePhase::Rating;
            tracing::debug!(trip_id = %trip.id(), "ride completed");
            Ok(trip.clone())
        })
    }

    /// rating → idle: record the optional rating and release the trip
    ///
    /// Returns the archived trip, marked completed.
    pub fn submit_rating(&self, rating: Option<Rating>) -> Result<Trip> {
        let archived = self.trips.update::<_, _, RideError>(|current| {
            let trip = expect_phase(current, RidePhase::Rating, RidePhase::Idle)?;
            trip.rating = rating;
            trip.status = Some(TripStatus::Completed);
            let archived = trip.clone();
            *current = None;
            Ok(archived)
        })?;

        tracing::debug!(
            trip_id = %archived.id(),
            rating = ?rating.map(|r| r.stars()),
            "ride rated"
        );
        Ok(archived)
    }

    /// Abandon the ride before it finishes
    ///
    /// Allowed from searching, service-selected and tracking. Returns the
    /// archived trip, marked cancelled.
    pub fn cancel(&self) -> Result<Trip> {
        let archived = self.trips.update::<_, _, RideError>(|current| {
            let phase = current.as_ref().map_or(RidePhase::Idle, |trip| trip.phase);
            if !matches!(
                phase,
                RidePhase::Searching | RidePhase::ServiceSelected | RidePhase::Tracking
            ) {
                return Err(invalid(phase, RidePhase::Idle));
            }
            let mut archived = current.take().ok_or_else(|| invalid(phase, RidePhase::Idle))?;
            archived.status = Some(TripStatus::Cancelled);
            Ok(archived)
        })?;

        tracing::debug!(trip_id = %archived.id(), "ride cancelled");
        Ok(archived)
    }

    /// Reconcile a trip with the server copy
    ///
    /// The container is only touched when it still holds `trip`:
    /// - unknown to the server: the container is cleared and `Ok(None)` returned
    /// - same phase on both sides: the server record replaces the local one
    /// - phases disagree: the container is cleared and
    ///   [`RideError::StaleTripReference`] returned
    /// - the server answers with another trip: nothing is installed and
    ///   [`RideError::StaleTripReference`] returned without a remote phase
    ///
    /// A failing collaborator leaves the container as it was.
    pub async fn force_refresh(&self, trip: &Trip) -> Result<Option<Trip>> {
        let id = trip.id();
        let snapshot = self.delivery.fetch_trip(&id).await?;

        let outcome = self.trips.update::<_, _, RideError>(|current| {
            let local = match current {
                Some(local) if local.id() == id => local.clone(),
                _ => return Ok(Refresh::Untracked),
            };

            match snapshot {
                None => {
                    *current = None;
                    Ok(Refresh::Gone)
                }
                Some(snapshot) if snapshot.trip.id() != id => Err(stale(&local, None)),
                Some(snapshot) if snapshot.phase() == local.phase => {
                    *current = Some(snapshot.trip.clone());
                    Ok(Refresh::Replaced(snapshot.trip))
                }
                Some(snapshot) => {
                    *current = None;
                    Ok(Refresh::Diverged(stale(&local, Some(snapshot.phase()))))
                }
            }
        })?;

        match outcome {
            Refresh::Untracked => {
                tracing::debug!(trip_id = %id, "refresh skipped, trip is not current");
                Ok(None)
            }
            Refresh::Gone => {
                tracing::info!(trip_id = %id, "trip unknown to server, cleared");
                Ok(None)
            }
            Refresh::Replaced(trip) => Ok(Some(trip)),
            Refresh::Diverged(err) => Err(err),
        }
    }

    /// Pull the driver match for the current trip and apply it
    ///
    /// Only valid once a service is selected. Returns `Ok(None)` while
    /// dispatch is still looking for a driver.
    pub async fn sync_driver(&self) -> Result<Option<Trip>> {
        let id = self.current_id(RidePhase::ServiceSelected, RidePhase::Tracking)?;
        let assignment = self.delivery.driver_assignment(&id).await?;
        if assignment.trip_id == id && assignment.driver.is_none() {
            return Ok(None);
        }
        self.begin_tracking(&assignment).map(Some)
    }

    /// Pull the progress of the current trip and apply it
    ///
    /// Only valid while tracking. Returns `Ok(None)` while the ride is still
    /// underway.
    pub async fn sync_completion(&self) -> Result<Option<Trip>> {
        let id = self.current_id(RidePhase::Tracking, RidePhase::Rating)?;
        let progress = self.delivery.progress(&id).await?;
        if progress.trip_id == id && !progress.completed {
            return Ok(None);
        }
        self.complete_ride(&progress).map(Some)
    }

    /// Id of the current trip, checked before any backend call
    fn current_id(&self, required: RidePhase, attempted: RidePhase) -> Result<TripId> {
        match self.trips.get_current() {
            Some(trip) if trip.phase == required => Ok(trip.id()),
            Some(trip) => Err(invalid(trip.phase, attempted)),
            None => Err(invalid(RidePhase::Idle, attempted)),
        }
    }
}
