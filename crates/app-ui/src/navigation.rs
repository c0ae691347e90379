//! Routes, screen contracts and the route guard
//!
//! Every ride-flow screen declares which lifecycle phases it may render in
//! and which phases it may leave behind. [`RouteGuard`] checks a requested
//! route against the session and the current phase and returns the route the
//! host should actually show.

use app_core::{ActiveRole, SessionMode};
use ride_client::{RidePhase, Role, TripId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Route Definitions
// =============================================================================

/// All routes in the application
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "route", content = "params")]
pub enum Route {
    // Auth
    /// Login method picker
    LoginOptions,
    /// Phone number entry
    PhoneInput,
    /// One-time code entry
    VerifyCode {
        /// Phone number the code was sent to
        phone: String,
    },

    // Onboarding
    /// Safety introduction
    OnboardingSecurity,
    /// Comfort introduction
    OnboardingComfort,

    // Passenger
    /// Passenger home with the map
    PassengerHome,
    /// Trip history list
    History,
    /// One archived trip
    HistoryDetails {
        /// Archived trip
        trip_id: TripId,
    },
    /// Notification feed
    Notifications,
    /// Passenger profile
    Profile,
    /// Loyalty program
    Fidelity,
    /// App settings
    Settings,
    /// Help center
    Support,
    /// Safety center
    Safety,

    // Ride flow
    /// Destination search
    RideSearch,
    /// Service tier picker
    SelectService,
    /// Driver match and live trip
    Tracking,
    /// Post-trip rating
    Rating,

    // Driver
    /// Driver home
    DriverHome,
    /// Driver registration
    DriverRegister,
    /// Driver earnings and payouts
    DriverWallet,
}

/// Route group, mirroring the app's layout folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteGroup {
    /// Sign-in screens
    Auth,
    /// First-run introduction
    Onboarding,
    /// Passenger screens outside a ride
    Passenger,
    /// Passenger ride flow
    Ride,
    /// Driver screens
    Driver,
}

const ALL_PHASES: &[RidePhase] = &[
    RidePhase::Idle,
    RidePhase::Searching,
    RidePhase::ServiceSelected,
    RidePhase::Tracking,
    RidePhase::Rating,
];

/// What a screen expects of the ride lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenContract {
    /// Phases the screen may render in
    pub valid_in: &'static [RidePhase],
    /// Phases the screen may leave the lifecycle in on exit
    pub produces: &'static [RidePhase],
}

impl ScreenContract {
    /// Contract of a screen that neither reads nor writes the ride
    pub const UNRESTRICTED: ScreenContract = ScreenContract { valid_in: ALL_PHASES, produces: &[] };

    /// Whether the screen may render in `phase`
    pub fn accepts(&self, phase: RidePhase) -> bool {
        self.valid_in.contains(&phase)
    }

    /// Whether the screen may leave the lifecycle in `phase`
    pub fn may_produce(&self, phase: RidePhase) -> bool {
        self.produces.contains(&phase)
    }
}

impl Route {
    /// Layout group the route belongs to
    pub fn group(&self) -> RouteGroup {
        match self {
            Route::LoginOptions | Route::PhoneInput | Route::VerifyCode { .. } => RouteGroup::Auth,
            Route::OnboardingSecurity | Route::OnboardingComfort => RouteGroup::Onboarding,
            Route::RideSearch | Route::SelectService | Route::Tracking | Route::Rating => {
                RouteGroup::Ride
            }
            Route::DriverHome | Route::DriverRegister | Route::DriverWallet => RouteGroup::Driver,
            _ => RouteGroup::Passenger,
        }
    }

    /// Check if this route requires a signed-in user
    pub fn requires_auth(&self) -> bool {
        !matches!(self.group(), RouteGroup::Auth | RouteGroup::Onboarding)
    }

    /// Role the user must hold to open this route
    pub fn required_role(&self) -> Option<Role> {
        match self.group() {
            RouteGroup::Driver => Some(Role::Driver),
            _ => None,
        }
    }

    /// Lifecycle contract of the screen behind this route
    pub fn contract(&self) -> ScreenContract {
        use RidePhase::*;

        match self {
            Route::RideSearch => {
                ScreenContract { valid_in: &[Idle, Searching], produces: &[Searching] }
            }
            Route::SelectService => {
                ScreenContract { valid_in: &[Searching], produces: &[ServiceSelected, Idle] }
            }
            Route::Tracking => ScreenContract {
                valid_in: &[ServiceSelected, Tracking],
                produces: &[Tracking, Rating, Idle],
            },
            Route::Rating => ScreenContract { valid_in: &[Rating], produces: &[Idle] },
            _ => ScreenContract::UNRESTRICTED,
        }
    }

    /// Path for the host router, with query parameters url-encoded
    pub fn path(&self) -> String {
        match self {
            Route::LoginOptions => "/auth/login-options".to_string(),
            Route::PhoneInput => "/auth/phone-input".to_string(),
            Route::VerifyCode { phone } => {
                format!("/auth/verify-code?phone={}", urlencoding::encode(phone))
            }
            Route::OnboardingSecurity => "/(onboarding)/security".to_string(),
            Route::OnboardingComfort => "/(onboarding)/comfort".to_string(),
            Route::PassengerHome => "/(passenger)/(home)".to_string(),
            Route::History => "/(passenger)/(home)/history".to_string(),
            Route::HistoryDetails { trip_id } => format!("/history/details?tripId={trip_id}"),
            Route::Notifications => "/(passenger)/notifications".to_string(),
            Route::Profile => "/(passenger)/profile".to_string(),
            Route::Fidelity => "/(passenger)/fidelity".to_string(),
            Route::Settings => "/(passenger)/settings".to_string(),
            Route::Support => "/(passenger)/support".to_string(),
            Route::Safety => "/(passenger)/safety".to_string(),
            Route::RideSearch => "/(passenger)/ride/search".to_string(),
            Route::SelectService => "/(passenger)/ride/select-service".to_string(),
            Route::Tracking => "/(passenger)/ride/tracking".to_string(),
            Route::Rating => "/(passenger)/ride/rating".to_string(),
            Route::DriverHome => "/driver/home".to_string(),
            Route::DriverRegister => "/driver/register".to_string(),
            Route::DriverWallet => "/driver/wallet".to_string(),
        }
    }

    /// Parse a path produced by [`Route::path`] (deep links)
    pub fn from_path(path: &str) -> Option<Route> {
        let (base, query) = match path.split_once('?') {
            Some((base, query)) => (base, parse_query(query)),
            None => (path, HashMap::new()),
        };
        let base = match base.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        let route = match base {
            "/auth/login-options" => Route::LoginOptions,
            "/auth/phone-input" => Route::PhoneInput,
            "/auth/verify-code" => Route::VerifyCode { phone: query.get("phone")?.clone() },
            "/(onboarding)/security" => Route::OnboardingSecurity,
            "/(onboarding)/comfort" => Route::OnboardingComfort,
            "/" | "/(passenger)/(home)" => Route::PassengerHome,
            "/(passenger)/(home)/history" => Route::History,
            "/history/details" => {
                Route::HistoryDetails { trip_id: TripId::parse(query.get("tripId")?).ok()? }
            }
            "/(passenger)/notifications" => Route::Notifications,
            "/(passenger)/profile" => Route::Profile,
            "/(passenger)/fidelity" => Route::Fidelity,
            "/(passenger)/settings" => Route::Settings,
            "/(passenger)/support" => Route::Support,
            "/(passenger)/safety" => Route::Safety,
            "/(passenger)/ride/search" => Route::RideSearch,
            "/(passenger)/ride/select-service" => Route::SelectService,
            "/(passenger)/ride/tracking" => Route::Tracking,
            "/(passenger)/ride/rating" => Route::Rating,
            "/driver/home" => Route::DriverHome,
            "/driver/register" => Route::DriverRegister,
            "/driver/wallet" => Route::DriverWallet,
            _ => return None,
        };
        Some(route)
    }

    /// Screen title
    pub fn title(&self) -> &'static str {
        match self {
            Route::LoginOptions => "Iniciar sesión",
            Route::PhoneInput => "Tu número",
            Route::VerifyCode { .. } => "Verificar código",
            Route::OnboardingSecurity => "Seguridad",
            Route::OnboardingComfort => "Comodidad",
            Route::PassengerHome => "Inicio",
            Route::History | Route::HistoryDetails { .. } => "Historial",
            Route::Notifications => "Notificaciones",
            Route::Profile => "Perfil",
            Route::Fidelity => "Fidelidad",
            Route::Settings => "Configuración",
            Route::Support => "Ayuda",
            Route::Safety => "Seguridad",
            Route::RideSearch => "¿A dónde vas?",
            Route::SelectService => "Elige tu servicio",
            Route::Tracking => "Tu viaje",
            Route::Rating => "Califica tu viaje",
            Route::DriverHome => "Conductor",
            Route::DriverRegister => "Registro de conductor",
            Route::DriverWallet => "Billetera",
        }
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let value = urlencoding::decode(value).ok()?;
            Some((key.to_string(), value.into_owned()))
        })
        .collect()
}

// =============================================================================
// Route Guard
// =============================================================================

/// Redirects requests whose preconditions do not hold
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteGuard;

impl RouteGuard {
    /// Create a guard
    pub fn new() -> Self {
        Self
    }

    /// Home screen for the active role
    pub fn home_for(role: ActiveRole) -> Route {
        match role {
            ActiveRole::Passenger => Route::PassengerHome,
            ActiveRole::Driver => Route::DriverHome,
        }
    }

    /// Nearest screen consistent with a ride phase
    pub fn screen_for_phase(phase: RidePhase) -> Route {
        match phase {
            RidePhase::Idle => Route::PassengerHome,
            RidePhase::Searching => Route::SelectService,
            RidePhase::ServiceSelected | RidePhase::Tracking => Route::Tracking,
            RidePhase::Rating => Route::Rating,
        }
    }

    /// Route to show for a request, given the session and the ride phase
    ///
    /// Checks run in order: sign-in, auth screens for signed-in users, driver
    /// role, then the screen's phase contract.
    pub fn resolve(&self, route: Route, session: &SessionMode, phase: RidePhase) -> Route {
        let resolved = match session {
            SessionMode::Anonymous if route.requires_auth() => Route::LoginOptions,
            SessionMode::Authenticated { role, .. } if route.group() == RouteGroup::Auth => {
                Self::home_for(*role)
            }
            _ if route.required_role().is_some_and(|role| !session.holds(role)) => {
                Route::PassengerHome
            }
            _ if !route.contract().accepts(phase) => Self::screen_for_phase(phase),
            _ => route.clone(),
        };

        if resolved != route {
            tracing::debug!(from = %route.path(), to = %resolved.path(), %phase, "route redirected");
        }
        resolved
    }
}
