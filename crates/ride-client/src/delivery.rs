//! Trip delivery collaborator
//!
//! Matching and dispatch live on the backend. The client only consumes what
//! they report: driver assignments, completion, and the authoritative trip
//! snapshot used to detect stale local state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::ApiClient;
use crate::trip::{DriverRef, RidePhase, Trip};
use crate::types::TripId;
use crate::Result;

/// Driver match report for a trip
///
/// `driver` is absent while dispatch is still looking for a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverAssignment {
    /// Trip the report refers to
    pub trip_id: TripId,
    /// Matched driver, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverRef>,
}

impl DriverAssignment {
    /// Report a confirmed match
    pub fn matched(trip_id: TripId, driver: DriverRef) -> Self {
        Self { trip_id, driver: Some(driver) }
    }

    /// Report that no driver has been matched yet
    pub fn pending(trip_id: TripId) -> Self {
        Self { trip_id, driver: None }
    }
}

/// Ride progress report for a trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripProgress {
    /// Trip the report refers to
    pub trip_id: TripId,
    /// Whether the ride reached its destination
    pub completed: bool,
}

/// Authoritative trip state as known by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSnapshot {
    /// The server's copy of the trip
    pub trip: Trip,
}

impl TripSnapshot {
    /// Phase the server reports for the trip
    pub fn phase(&self) -> RidePhase {
        self.trip.phase
    }
}

/// Source of truth for trip progress
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait TripDelivery: Send + Sync {
    /// Fetch the authoritative trip state; `None` when the trip is unknown
    async fn fetch_trip(&self, trip_id: &TripId) -> Result<Option<TripSnapshot>>;

    /// Current driver match for a trip
    async fn driver_assignment(&self, trip_id: &TripId) -> Result<DriverAssignment>;

    /// Current progress for a trip
    async fn progress(&self, trip_id: &TripId) -> Result<TripProgress>;
}

/// Supplies the bearer token for authenticated requests
///
/// Implemented by the session store so that token reads stay funneled through
/// one place.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current session token, if any
    async fn token(&self) -> Option<String>;
}

/// [`TripDelivery`] over HTTP (`/trips/:id`)
#[derive(Clone)]
pub struct HttpTripDelivery {
    client: ApiClient,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpTripDelivery {
    /// Create a delivery client that authenticates with the provided tokens
    pub fn new(client: ApiClient, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { client, tokens }
    }
}

#[async_trait]
impl TripDelivery for HttpTripDelivery {
    async fn fetch_trip(&self, trip_id: &TripId) -> Result<Option<TripSnapshot>> {
        let token = self.tokens.token().await;
        self.client
            .get_optional(&format!("/trips/{trip_id}"), token.as_deref())
            .await
    }

    async fn driver_assignment(&self, trip_id: &TripId) -> Result<DriverAssignment> {
        let token = self.tokens.token().await;
        self.client
            .get(&format!("/trips/{trip_id}/driver"), token.as_deref())
            .await
    }

    async fn progress(&self, trip_id: &TripId) -> Result<TripProgress> {
        let token = self.tokens.token().await;
        self.client
            .get(&format!("/trips/{trip_id}/progress"), token.as_deref())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_assignment_has_no_driver() {
        let id = TripId::new();
        let assignment = DriverAssignment::pending(id);
        assert_eq!(assignment.trip_id, id);
        assert!(assignment.driver.is_none());

        let json = serde_json::to_value(&assignment).unwrap();
        assert!(json.get("driver").is_none());
    }

    #[tokio::test]
    async fn test_mock_delivery_reports_unknown_trip() {
        let mut delivery = MockTripDelivery::new();
        delivery.expect_fetch_trip().returning(|_| Ok(None));

        let snapshot = delivery.fetch_trip(&TripId::new()).await.unwrap();
        assert!(snapshot.is_none());
    }
}
