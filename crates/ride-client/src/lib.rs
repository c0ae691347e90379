//! RuDix API client library
//!
//! This crate provides the wire and domain types shared by every layer of the
//! client (trips, users, identifiers), the HTTP API client, and the two backend
//! collaborators the client core consumes: the auth API and trip delivery.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod auth;
pub mod delivery;
pub mod trip;
pub mod types;
pub mod user;

pub use api::{ApiClient, ApiConfig};
pub use auth::{AuthApi, HttpAuthApi};
pub use delivery::{
    DriverAssignment, HttpTripDelivery, TokenProvider, TripDelivery, TripProgress, TripSnapshot,
};
pub use trip::{DriverRef, Rating, RidePhase, ServiceTier, Trip, TripStatus};
pub use types::{DriverId, TripId, UserId};
pub use user::{FidelityTier, Role, User};

/// Result type for API operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to the RuDix backend
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure (connect, timeout, TLS)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Credentials missing or rejected (HTTP 401)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A value received or supplied could not be interpreted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Any other non-success status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Server-provided message, or the raw body
        message: String,
    },
}

impl Error {
    /// Whether the server rejected the credentials used for the request
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Error::Auth(_) => true,
            Error::Api { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// Whether retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(Error::Api { status: 503, message: "down".to_string() }.is_transient());
        assert!(!Error::Api { status: 404, message: "gone".to_string() }.is_transient());
        assert!(!Error::InvalidInput("bad id".to_string()).is_transient());
    }

    #[test]
    fn test_unauthorized_detection() {
        assert!(Error::Auth("expired".to_string()).is_unauthorized());
        assert!(Error::Api { status: 401, message: "no".to_string() }.is_unauthorized());
        assert!(!Error::Api { status: 500, message: "boom".to_string() }.is_unauthorized());
    }
}
