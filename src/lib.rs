//! RuDix ride client core
//!
//! [`RudixApp`] wires the workspace crates into one client: the session
//! store and auth session, the current-trip container with the ride
//! lifecycle on top, trip history, the notification feed, the driver shift,
//! and the route guard the host app asks before showing a screen.
//!
//! # Example
//!
//! ```rust,no_run
//! use rudix::{AppConfig, RudixApp};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::from_env()?;
//!     rudix::logging::init_tracing(&(&config).into());
//!
//!     let app = RudixApp::bootstrap(config).await?;
//!     let entry = app.start().await;
//!     println!("opening {}", entry.path());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod logging;

pub use config::{AppConfig, ConfigError, Environment};

use anyhow::Context;
use app_core::{
    ActiveRole, AuthError, AuthSession, DriverShift, NotificationFeed, RideError, RideLifecycle,
    SessionMode, ShiftError,
};
use app_state::{SessionStore, TripHistory, TripStore};
use app_ui::{Route, RouteGuard};
use ride_client::{
    ApiClient, ApiConfig, AuthApi, HttpAuthApi, HttpTripDelivery, Rating, RidePhase, Trip,
    TripDelivery,
};
use std::sync::Arc;
use storage::{KvConfig, KvSecureStorage, KvStore, SecureStorage};

/// The assembled client
pub struct RudixApp {
    config: AppConfig,
    session_store: Arc<SessionStore>,
    auth: AuthSession,
    ride: RideLifecycle,
    history: TripHistory,
    notifications: NotificationFeed,
    driver: DriverShift,
    guard: RouteGuard,
}

impl RudixApp {
    /// Build the client against the configured backend and data directory
    pub async fn bootstrap(config: AppConfig) -> anyhow::Result<Self> {
        let kv = KvStore::new(KvConfig::new(config.kv_path()))
            .with_context(|| format!("opening key-value store in {}", config.data_dir.display()))?;
        let session_store = Arc::new(SessionStore::new(Arc::new(KvSecureStorage::new(kv))));

        let client = ApiClient::new(
            ApiConfig::new(config.api_url.clone()).timeout(config.request_timeout),
        )
        .context("building HTTP client")?;
        let auth_api = Arc::new(HttpAuthApi::new(client.clone()));
        let delivery = Arc::new(HttpTripDelivery::new(client, session_store.clone()));

        let history = TripHistory::open(config.history_path())
            .await
            .context("opening trip history")?;

        tracing::info!(
            environment = ?config.environment,
            api_url = %config.api_url,
            "client bootstrapped"
        );
        Ok(Self::assemble(config, session_store, auth_api, delivery, history))
    }

    /// Build the client from explicit collaborators
    pub fn with_collaborators(
        config: AppConfig,
        secure: Arc<dyn SecureStorage>,
        auth_api: Arc<dyn AuthApi>,
        delivery: Arc<dyn TripDelivery>,
        history: TripHistory,
    ) -> Self {
        let session_store = Arc::new(SessionStore::new(secure));
        Self::assemble(config, session_store, auth_api, delivery, history)
    }

    fn assemble(
        config: AppConfig,
        session_store: Arc<SessionStore>,
        auth_api: Arc<dyn AuthApi>,
        delivery: Arc<dyn TripDelivery>,
        history: TripHistory,
    ) -> Self {
        Self {
            config,
            auth: AuthSession::new(auth_api, session_store.clone()),
            session_store,
            ride: RideLifecycle::new(Arc::new(TripStore::new()), delivery),
            history,
            notifications: NotificationFeed::default(),
            driver: DriverShift::new(),
            guard: RouteGuard::new(),
        }
    }

    /// Restore the previous session and return the entry route
    ///
    /// A backend that cannot be reached leaves the user logged out; the stored
    /// token is kept for the next attempt.
    pub async fn start(&self) -> Route {
        let mode = match self.auth.restore().await {
            Ok(mode) => mode,
            Err(e) => {
                tracing::warn!(error = %e, "session restore failed");
                SessionMode::Anonymous
            }
        };

        let entry = match mode.role() {
            Some(role) => RouteGuard::home_for(role),
            None => Route::LoginOptions,
        };
        self.navigate(entry).await
    }

    /// Route to show for a navigation request
    pub async fn navigate(&self, route: Route) -> Route {
        let mode = self.auth.mode().await;
        self.guard.resolve(route, &mode, self.ride.phase())
    }

    /// Start a ride for the signed-in passenger
    ///
    /// Fails with [`RideError::NotPermitted`] unless the session is acting
    /// as a passenger.
    pub async fn request_ride(&self, destination: Option<String>) -> Result<Trip, RideError> {
        let grant = self.auth.passenger_grant().await?;
        self.ride.request_ride(&grant, destination)
    }

    /// Put the signed-in driver on shift
    pub async fn go_online(&self) -> Result<(), ShiftError> {
        let grant = self.auth.driver_grant().await?;
        self.driver.go_online(&grant)
    }

    /// Act in another role; leaving the driver role ends the shift
    pub async fn switch_role(&self, role: ActiveRole) -> Result<(), AuthError> {
        self.auth.switch_role(role).await?;
        if role != ActiveRole::Driver {
            self.driver.end_shift();
        }
        Ok(())
    }

    /// Rate the finished ride and archive it
    pub async fn finish_ride(&self, rating: Option<Rating>) -> Result<Trip, RideError> {
        let trip = self.ride.submit_rating(rating)?;
        self.archive(&trip).await;
        Ok(trip)
    }

    /// Cancel the ride in progress and archive it
    pub async fn cancel_ride(&self) -> Result<Trip, RideError> {
        let trip = self.ride.cancel()?;
        self.archive(&trip).await;
        Ok(trip)
    }

    /// Sign out
    ///
    /// Any ride in progress is closed and archived, the driver shift ended
    /// and the notification feed emptied before the session goes away.
    pub async fn logout(&self) -> anyhow::Result<()> {
        let closed = match self.ride.phase() {
            RidePhase::Idle => None,
            RidePhase::Rating => Some(self.ride.submit_rating(None)?),
            _ => Some(self.ride.cancel()?),
        };
        if let Some(trip) = closed {
            self.archive(&trip).await;
        }
        self.driver.end_shift();
        self.notifications.replace(Vec::new());

        self.auth.logout().await.context("logging out")?;
        Ok(())
    }

    async fn archive(&self, trip: &Trip) {
        if let Err(e) = self.history.add(trip.clone()).await {
            tracing::warn!(trip_id = %trip.id(), error = %e, "failed to archive trip");
        }
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Session token store
    pub fn session_store(&self) -> &Arc<SessionStore> {
        &self.session_store
    }

    /// Signed-in session
    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    /// Passenger ride lifecycle
    pub fn ride(&self) -> &RideLifecycle {
        &self.ride
    }

    /// Current-trip container
    pub fn trips(&self) -> &Arc<TripStore> {
        self.ride.trips()
    }

    /// Archived trips
    pub fn history(&self) -> &TripHistory {
        &self.history
    }

    /// Notification feed
    pub fn notifications(&self) -> &NotificationFeed {
        &self.notifications
    }

    /// Driver shift; going online goes through [`RudixApp::go_online`]
    pub fn driver(&self) -> &DriverShift {
        &self.driver
    }
}
