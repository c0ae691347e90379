//! Authentication session
//!
//! [`AuthSession`] holds who is signed in and which role they are acting in.
//! Tokens are only ever read or written through the [`SessionStore`]; this
//! module decides when.
//!
//! # Example
//!
//! ```rust,no_run
//! use app_core::auth::{ActiveRole, AuthSession};
//! use app_state::SessionStore;
//! use ride_client::{ApiClient, ApiConfig, HttpAuthApi};
//! use std::sync::Arc;
//! use storage::MemorySecureStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = HttpAuthApi::new(ApiClient::new(ApiConfig::new("https://api.rudix.com"))?);
//!     let store = Arc::new(SessionStore::new(Arc::new(MemorySecureStorage::new())));
//!     let session = AuthSession::new(Arc::new(api), store);
//!
//!     session.login("kiki@rudix.com", "secret123").await?;
//!     if session.switch_role(ActiveRole::Driver).await.is_ok() {
//!         println!("driving");
//!     }
//!     session.logout().await?;
//!     Ok(())
//! }
//! ```

use app_state::{SessionError, SessionStore};
use ride_client::auth::{
    LoginRequest, LoginResponse, RegisterRequest, SendOtpRequest, SendOtpResponse,
    VerifyOtpRequest,
};
use ride_client::{AuthApi, Role, User, UserId};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, RwLock};

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Auth API error
    #[error("API error: {0}")]
    Api(#[from] ride_client::Error),

    /// Session store error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// No user is signed in
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The user does not hold the requested role
    #[error("User does not hold role {0:?}")]
    RoleNotHeld(Role),

    /// The user holds the role but is currently acting in another one
    #[error("Acting as {active:?}, {required:?} required")]
    RoleNotActive {
        /// Role the flow needs
        required: ActiveRole,
        /// Role in use
        active: ActiveRole,
    },

    /// A replacement record belongs to another user
    #[error("User mismatch: signed in as {expected}, got {found}")]
    UserMismatch {
        /// Signed-in user
        expected: UserId,
        /// User on the replacement record
        found: UserId,
    },
}

/// Result type for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Role the signed-in user is acting in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActiveRole {
    /// Passenger flows
    Passenger,
    /// Driver flows
    Driver,
}

impl ActiveRole {
    /// Role a user must hold to act in this one
    pub fn role(&self) -> Role {
        match self {
            ActiveRole::Passenger => Role::Passenger,
            ActiveRole::Driver => Role::Driver,
        }
    }
}

impl From<Role> for ActiveRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Passenger => ActiveRole::Passenger,
            Role::Driver => ActiveRole::Driver,
        }
    }
}

/// In-memory session state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionMode {
    /// Nobody signed in
    #[default]
    Anonymous,
    /// Signed in and acting in one role
    Authenticated {
        /// Signed-in user
        user: User,
        /// Role in use
        role: ActiveRole,
    },
}

impl SessionMode {
    /// Whether a user is signed in
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionMode::Authenticated { .. })
    }

    /// Signed-in user
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionMode::Authenticated { user, .. } => Some(user),
            SessionMode::Anonymous => None,
        }
    }

    /// Active role
    pub fn role(&self) -> Option<ActiveRole> {
        match self {
            SessionMode::Authenticated { role, .. } => Some(*role),
            SessionMode::Anonymous => None,
        }
    }

    /// Whether the signed-in user holds a role
    pub fn holds(&self, role: Role) -> bool {
        self.user().is_some_and(|user| user.has_role(role))
    }
}

/// Proof that the session was acting as a passenger when it was issued
///
/// Only [`AuthSession::passenger_grant`] hands these out; ride requests take
/// one instead of a bare user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassengerGrant {
    user_id: UserId,
}

impl PassengerGrant {
    pub(crate) fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    /// Passenger the grant was issued to
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

/// Proof that the session was acting as a driver when it was issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverGrant {
    user_id: UserId,
}

impl DriverGrant {
    pub(crate) fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    /// Driver the grant was issued to
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

/// Signed-in user and active role
pub struct AuthSession {
    api: Arc<dyn AuthApi>,
    store: Arc<SessionStore>,
    mode: RwLock<SessionMode>,
    tx: watch::Sender<SessionMode>,
}

impl AuthSession {
    /// Create an anonymous session
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<SessionStore>) -> Self {
        let (tx, _) = watch::channel(SessionMode::Anonymous);
        Self { api, store, mode: RwLock::new(SessionMode::Anonymous), tx }
    }

    /// Snapshot of the session state
    pub async fn mode(&self) -> SessionMode {
        self.mode.read().await.clone()
    }

    /// Subscribe to session changes
    pub fn subscribe(&self) -> watch::Receiver<SessionMode> {
        self.tx.subscribe()
    }

    /// Restore the session saved by a previous run
    ///
    /// A stored token is checked against the server. Drivers resume in the
    /// driver role. An unreadable or rejected token is deleted and the session
    /// stays anonymous; other API failures keep the token so the caller can
    /// retry later.
    pub async fn restore(&self) -> Result<SessionMode> {
        let mut mode = self.mode.write().await;

        let token = match self.store.get_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!("no stored session");
                self.publish(&mut mode, SessionMode::Anonymous);
                return Ok(SessionMode::Anonymous);
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored session unreadable");
                self.discard_token().await;
                self.publish(&mut mode, SessionMode::Anonymous);
                return Ok(SessionMode::Anonymous);
            }
        };

        match self.api.current_user(&token).await {
            Ok(user) => {
                let role = if user.has_role(Role::Driver) {
                    ActiveRole::Driver
                } else {
                    ActiveRole::Passenger
                };
                tracing::info!(user_id = %user.id, ?role, "session restored");
                self.publish(&mut mode, SessionMode::Authenticated { user, role });
                Ok(mode.clone())
            }
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(error = %e, "stored session rejected");
                self.discard_token().await;
                self.publish(&mut mode, SessionMode::Anonymous);
                Ok(SessionMode::Anonymous)
            }
            Err(e) => {
                tracing::warn!(error = %e, transient = e.is_transient(), "session check failed");
                self.publish(&mut mode, SessionMode::Anonymous);
                Err(e.into())
            }
        }
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let response = self
            .api
            .login(LoginRequest { email: email.to_string(), password: password.to_string() })
            .await?;
        self.establish(response).await
    }

    /// Create an account and sign in
    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        let response = self.api.register(request).await?;
        self.establish(response).await
    }

    /// Send a one-time code to a phone number
    pub async fn send_code(&self, phone: &str) -> Result<SendOtpResponse> {
        Ok(self.api.send_otp(SendOtpRequest { telefono: phone.to_string() }).await?)
    }

    /// Sign in with a one-time code
    pub async fn verify_code(&self, phone: &str, code: &str) -> Result<User> {
        let response = self
            .api
            .verify_otp(VerifyOtpRequest { telefono: phone.to_string(), code: code.to_string() })
            .await?;
        self.establish(response).await
    }

    /// Sign out
    ///
    /// The server is told first (best effort). The token is then deleted and
    /// the in-memory session cleared while the session lock is held, so once
    /// this resolves nothing observes the old session. A failed delete is
    /// reported after memory has been cleared.
    pub async fn logout(&self) -> Result<()> {
        let mut mode = self.mode.write().await;

        if let Ok(Some(token)) = self.store.get_token().await {
            if let Err(e) = self.api.logout(&token).await {
                tracing::warn!(error = %e, "server logout failed");
            }
        }

        let deleted = self.store.delete_token().await;
        self.publish(&mut mode, SessionMode::Anonymous);
        tracing::info!("logged out");

        deleted.map_err(AuthError::from)
    }

    /// Act in another role the user holds
    pub async fn switch_role(&self, role: ActiveRole) -> Result<()> {
        let mut mode = self.mode.write().await;
        let user = match &*mode {
            SessionMode::Authenticated { user, .. } => user.clone(),
            SessionMode::Anonymous => return Err(AuthError::NotAuthenticated),
        };

        if !user.has_role(role.role()) {
            tracing::warn!(user_id = %user.id, ?role, "role not held");
            return Err(AuthError::RoleNotHeld(role.role()));
        }

        tracing::debug!(user_id = %user.id, ?role, "switched role");
        self.publish(&mut mode, SessionMode::Authenticated { user, role });
        Ok(())
    }

    /// Gate for role-scoped flows; returns the signed-in user
    pub async fn require_role(&self, role: Role) -> Result<User> {
        match &*self.mode.read().await {
            SessionMode::Authenticated { user, .. } if user.has_role(role) => Ok(user.clone()),
            SessionMode::Authenticated { .. } => Err(AuthError::RoleNotHeld(role)),
            SessionMode::Anonymous => Err(AuthError::NotAuthenticated),
        }
    }

    /// Gate for the passenger ride flow
    pub async fn passenger_grant(&self) -> Result<PassengerGrant> {
        self.require_active(ActiveRole::Passenger)
            .await
            .map(|user| PassengerGrant::new(user.id))
    }

    /// Gate for the driver shift
    pub async fn driver_grant(&self) -> Result<DriverGrant> {
        self.require_active(ActiveRole::Driver).await.map(|user| DriverGrant::new(user.id))
    }

    async fn require_active(&self, required: ActiveRole) -> Result<User> {
        match &*self.mode.read().await {
            SessionMode::Authenticated { user, .. } if !user.has_role(required.role()) => {
                Err(AuthError::RoleNotHeld(required.role()))
            }
            SessionMode::Authenticated { user, role } if *role == required => Ok(user.clone()),
            SessionMode::Authenticated { role, .. } => {
                tracing::warn!(?required, active = ?role, "flow requires another role");
                Err(AuthError::RoleNotActive { required, active: *role })
            }
            SessionMode::Anonymous => Err(AuthError::NotAuthenticated),
        }
    }

    /// Replace the user record after a confirmed server sync
    ///
    /// If the new record no longer grants the active role, the session falls
    /// back to the passenger role.
    pub async fn replace_user(&self, user: User) -> Result<()> {
        let mut mode = self.mode.write().await;
        let role = match &*mode {
            SessionMode::Authenticated { user: current, role } => {
                if current.id != user.id {
                    return Err(AuthError::UserMismatch {
                        expected: current.id.clone(),
                        found: user.id,
                    });
                }
                *role
            }
            SessionMode::Anonymous => return Err(AuthError::NotAuthenticated),
        };

        let role = if user.has_role(role.role()) { role } else { ActiveRole::Passenger };
        self.publish(&mut mode, SessionMode::Authenticated { user, role });
        Ok(())
    }

    async fn establish(&self, response: LoginResponse) -> Result<User> {
        let mut mode = self.mode.write().await;
        self.store.save_token(&response.token).await?;

        let user = response.user;
        tracing::info!(user_id = %user.id, "signed in");
        self.publish(
            &mut mode,
            SessionMode::Authenticated { user: user.clone(), role: ActiveRole::Passenger },
        );
        Ok(user)
    }

    async fn discard_token(&self) {
        if let Err(e) = self.store.delete_token().await {
            tracing::warn!(error = %e, "failed to discard session token");
        }
    }

    fn publish(&self, mode: &mut SessionMode, next: SessionMode) {
        *mode = next;
        self.tx.send_replace(mode.clone());
    }
}
