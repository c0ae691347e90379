//! Core ride logic for RuDix
//!
//! This crate contains the rules that sit between the screens and the
//! backend: the passenger ride lifecycle, the driver shift, the signed-in
//! session and its active role, and the notification feed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod driver;
pub mod notifications;
pub mod ride;

pub use auth::{ActiveRole, AuthError, AuthSession, DriverGrant, PassengerGrant, SessionMode};
pub use driver::{DriverPhase, DriverShift, ShiftError};
pub use notifications::{
    NotificationCategory, NotificationFeed, NotificationFilter, NotificationIcon,
    NotificationItem, UnreadDisplay,
};
pub use ride::{RideError, RideLifecycle};
