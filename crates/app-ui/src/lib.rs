//! Navigation layer for RuDix
//!
//! Screens themselves are rendered by the host app. This crate owns what the
//! host needs to route between them: the route table with expo-router paths,
//! the contract each ride screen declares against the ride lifecycle, and the
//! guard that sends users to a consistent screen when a route's
//! preconditions do not hold.
//!
//! # Example
//!
//! ```rust
//! use app_core::SessionMode;
//! use app_ui::{Route, RouteGuard};
//! use ride_client::RidePhase;
//!
//! let guard = RouteGuard::new();
//!
//! // Anonymous users are sent to the login options
//! let route = guard.resolve(Route::Tracking, &SessionMode::Anonymous, RidePhase::Idle);
//! assert_eq!(route, Route::LoginOptions);
//! assert_eq!(route.path(), "/auth/login-options");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod navigation;

pub use navigation::{Route, RouteGroup, RouteGuard, ScreenContract};
