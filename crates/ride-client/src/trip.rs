//! Trip records and ride phases
//!
//! A [`Trip`] is the single record every ride screen reads. Its identity is
//! fixed at creation; everything else is replaced wholesale by the lifecycle
//! machine in `app-core`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{DriverId, TripId, UserId};

/// Passenger-facing ride phase
///
/// `Idle` is the phase of an empty trip container; a stored [`Trip`] is always
/// in one of the other phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RidePhase {
    /// No ride in progress
    Idle,
    /// Destination chosen, waiting for a service tier
    Searching,
    /// Service tier chosen, waiting for a driver match
    ServiceSelected,
    /// Driver assigned, ride underway
    Tracking,
    /// Ride finished, waiting for the passenger's rating
    Rating,
}

impl RidePhase {
    /// Whether a trip record must exist in this phase
    pub fn has_trip(&self) -> bool {
        !matches!(self, RidePhase::Idle)
    }

    /// Kebab-case name used in logs and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            RidePhase::Idle => "idle",
            RidePhase::Searching => "searching",
            RidePhase::ServiceSelected => "service-selected",
            RidePhase::Tracking => "tracking",
            RidePhase::Rating => "rating",
        }
    }
}

impl fmt::Display for RidePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ride service tier offered on the select-service screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTier {
    /// RuDix Eco
    Eco,
    /// RuDix Plus
    Plus,
    /// Local taxi
    Taxi,
}

impl ServiceTier {
    /// All tiers in display order
    pub const ALL: [ServiceTier; 3] = [ServiceTier::Eco, ServiceTier::Plus, ServiceTier::Taxi];

    /// Display name shown to the passenger
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceTier::Eco => "RuDix Eco",
            ServiceTier::Plus => "RuDix Plus",
            ServiceTier::Taxi => "Taxi Local",
        }
    }
}

/// Final status of an archived trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    /// Ride finished and rated (or rating skipped)
    Completed,
    /// Ride abandoned before completion
    Cancelled,
}

/// Driver information attached once a match is assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRef {
    /// Driver identifier
    pub id: DriverId,
    /// Display name
    pub name: String,
    /// Profile photo URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Vehicle make and model
    pub vehicle_model: String,
    /// License plate
    pub vehicle_plate: String,
    /// Aggregate driver rating
    pub rating: f32,
}

/// Passenger rating for a finished ride, 1 to 5 stars
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted star count
    pub const MIN: u8 = 1;
    /// Highest accepted star count
    pub const MAX: u8 = 5;

    /// Create a rating, rejecting values outside 1..=5
    pub fn new(stars: u8) -> crate::Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&stars) {
            Ok(Self(stars))
        } else {
            Err(crate::Error::InvalidInput(format!(
                "rating must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                stars
            )))
        }
    }

    /// Number of stars
    pub fn stars(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = crate::Error;

    fn try_from(value: u8) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

/// A single ride request and its execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    id: TripId,

    /// Current lifecycle phase
    pub phase: RidePhase,

    /// Requesting passenger
    pub passenger: UserId,

    /// Matched driver (absent until tracking)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverRef>,

    /// Chosen service tier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceTier>,

    /// Passenger rating (only set once the trip is archived)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,

    /// Destination label picked on the search screen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// When the ride was requested
    pub created_at: DateTime<Utc>,

    /// Final status, set when the trip leaves the active container
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TripStatus>,
}

impl Trip {
    /// Create a fresh trip in the searching phase
    pub fn new(passenger: UserId, destination: Option<String>) -> Self {
        Self::with_id(TripId::new(), passenger, destination)
    }

    /// Create a searching trip with a caller-chosen identifier
    pub fn with_id(id: TripId, passenger: UserId, destination: Option<String>) -> Self {
        Self {
            id,
            phase: RidePhase::Searching,
            passenger,
            driver: None,
            service: None,
            rating: None,
            destination,
            created_at: Utc::now(),
            status: None,
        }
    }

    /// Trip identifier
    pub fn id(&self) -> TripId {
        self.id
    }
}
