//! End-to-end ride flows through the assembled client
//!
//! The backend collaborators are mocked; storage is in memory and history
//! lives in a temp directory.

use app_core::{
    ActiveRole, AuthError, DriverPhase, NotificationFilter, NotificationItem, RideError,
    ShiftError, UnreadDisplay,
};
use app_ui::Route;
use ride_client::auth::{LoginResponse, MockAuthApi};
use ride_client::delivery::MockTripDelivery;
use ride_client::{
    DriverAssignment, DriverId, DriverRef, Rating, RidePhase, Role, ServiceTier, TripProgress,
    TripId, TripStatus, User, UserId,
};
use rudix::{AppConfig, RudixApp};
use std::collections::HashSet;
use std::sync::Arc;
use storage::MemorySecureStorage;
use tempfile::TempDir;

fn passenger() -> User {
    user(vec![Role::Passenger])
}

fn user(roles: Vec<Role>) -> User {
    User {
        id: UserId::new("u-42"),
        first_name: "Kiki".to_string(),
        last_name: "Mock".to_string(),
        email: "kiki@rudix.com".to_string(),
        phone: "+123456789".to_string(),
        photo_url: None,
        roles,
        rating: None,
        total_trips: None,
        fidelity_level: None,
    }
}

fn driver() -> DriverRef {
    DriverRef {
        id: DriverId::new("d-7"),
        name: "Carlos Pérez".to_string(),
        photo_url: None,
        vehicle_model: "Nissan Versa".to_string(),
        vehicle_plate: "ABC-123".to_string(),
        rating: 4.9,
    }
}

fn auth_api(user: User) -> MockAuthApi {
    let mut api = MockAuthApi::new();
    api.expect_login().returning(move |_| {
        Ok(LoginResponse {
            user: user.clone(),
            token: "tok-abc".to_string(),
            refresh_token: None,
            success: true,
        })
    });
    api.expect_logout().returning(|_| Ok(()));
    api
}

fn matching_delivery() -> MockTripDelivery {
    let mut delivery = MockTripDelivery::new();
    delivery
        .expect_driver_assignment()
        .returning(|id| Ok(DriverAssignment::matched(*id, driver())));
    delivery
        .expect_progress()
        .returning(|id| Ok(TripProgress { trip_id: *id, completed: true }));
    delivery
}

async fn signed_out_app(
    dir: &TempDir,
    delivery: MockTripDelivery,
    user: User,
    secure: Arc<MemorySecureStorage>,
) -> RudixApp {
    let history = app_state::TripHistory::open(dir.path().join("history.json")).await.unwrap();
    RudixApp::with_collaborators(
        AppConfig::default().data_dir(dir.path()),
        secure,
        Arc::new(auth_api(user)),
        Arc::new(delivery),
        history,
    )
}

async fn app_with(dir: &TempDir, delivery: MockTripDelivery) -> RudixApp {
    let secure = Arc::new(MemorySecureStorage::new());
    let app = signed_out_app(dir, delivery, passenger(), secure).await;
    app.auth().login("kiki@rudix.com", "secret123").await.unwrap();
    app
}

#[tokio::test]
async fn test_full_ride_cycle() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, matching_delivery()).await;
    let ride = app.ride();
    let mut observer = app.trips().subscribe();

    assert_eq!(app.navigate(Route::Tracking).await, Route::PassengerHome);

    let trip = app.request_ride(Some("Plaza Carso".to_string())).await.unwrap();
    observer.changed().await.unwrap();
    assert_eq!(observer.borrow_and_update().as_ref().map(|t| t.phase), Some(RidePhase::Searching));
    assert_eq!(app.navigate(Route::RideSearch).await, Route::RideSearch);

    ride.select_service(ServiceTier::Plus).unwrap();
    assert_eq!(app.navigate(Route::SelectService).await, Route::Tracking);

    let tracking = ride.sync_driver().await.unwrap().unwrap();
    assert_eq!(tracking.phase, RidePhase::Tracking);
    assert_eq!(tracking.driver.as_ref().map(|d| d.name.as_str()), Some("Carlos Pérez"));

    ride.sync_completion().await.unwrap().unwrap();
    assert_eq!(app.navigate(Route::Tracking).await, Route::Rating);

    let archived = app.finish_ride(Some(Rating::new(4).unwrap())).await.unwrap();
    assert_eq!(archived.id(), trip.id());
    assert!(app.trips().get_current().is_none());
    assert_eq!(app.navigate(Route::Rating).await, Route::PassengerHome);

    let history = app.history().list().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, Some(TripStatus::Completed));
    assert_eq!(history[0].rating.map(|r| r.stars()), Some(4));
    assert_eq!(history[0].passenger, UserId::new("u-42"));
}

#[tokio::test]
async fn test_ids_are_not_reused_across_cycles() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, matching_delivery()).await;
    let mut ids = HashSet::new();

    for _ in 0..5 {
        let trip = app.request_ride(None).await.unwrap();
        assert!(ids.insert(trip.id()));
        app.ride().select_service(ServiceTier::Eco).unwrap();
        app.ride().sync_driver().await.unwrap();
        app.ride().sync_completion().await.unwrap();
        app.finish_ride(None).await.unwrap();
    }

    assert_eq!(app.history().len().await.unwrap(), 5);
}

#[tokio::test]
async fn test_cancel_mid_ride() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, matching_delivery()).await;

    let trip = app.request_ride(None).await.unwrap();
    app.ride().select_service(ServiceTier::Taxi).unwrap();
    app.ride().sync_driver().await.unwrap();

    let cancelled = app.cancel_ride().await.unwrap();
    assert_eq!(cancelled.status, Some(TripStatus::Cancelled));
    assert_eq!(app.ride().phase(), RidePhase::Idle);
    assert_eq!(app.history().get(&trip.id()).await.unwrap(), Some(cancelled));

    // Nothing left to cancel or rate
    assert!(matches!(app.cancel_ride().await, Err(RideError::InvalidTransition { .. })));
    assert!(app.finish_ride(None).await.is_err());
}

#[tokio::test]
async fn test_force_refresh_of_unknown_trip_returns_home() {
    let dir = TempDir::new().unwrap();
    let mut delivery = MockTripDelivery::new();
    delivery.expect_fetch_trip().times(1).returning(|_| Ok(None));
    let app = app_with(&dir, delivery).await;

    let trip = app.request_ride(None).await.unwrap();
    app.ride().select_service(ServiceTier::Eco).unwrap();

    assert!(app.ride().force_refresh(&trip).await.unwrap().is_none());
    assert_eq!(app.ride().phase(), RidePhase::Idle);
    assert_eq!(app.navigate(Route::Tracking).await, Route::PassengerHome);
}

#[tokio::test]
async fn test_logout_closes_ride_and_session() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, matching_delivery()).await;
    assert_eq!(app.auth().mode().await.role(), Some(ActiveRole::Passenger));

    let trip = app.request_ride(None).await.unwrap();
    app.logout().await.unwrap();

    assert!(app.trips().get_current().is_none());
    assert!(app.session_store().get_token().await.unwrap().is_none());
    assert_eq!(app.navigate(Route::PassengerHome).await, Route::LoginOptions);
    assert_eq!(
        app.history().get(&trip.id()).await.unwrap().and_then(|t| t.status),
        Some(TripStatus::Cancelled)
    );
}

#[tokio::test]
async fn test_ride_requires_passenger_session() {
    let dir = TempDir::new().unwrap();
    let secure = Arc::new(MemorySecureStorage::new());
    let app = signed_out_app(
        &dir,
        MockTripDelivery::new(),
        user(vec![Role::Passenger, Role::Driver]),
        secure,
    )
    .await;

    assert!(matches!(
        app.request_ride(None).await,
        Err(RideError::NotPermitted(AuthError::NotAuthenticated))
    ));

    app.auth().login("kiki@rudix.com", "secret123").await.unwrap();
    app.switch_role(ActiveRole::Driver).await.unwrap();
    assert!(matches!(
        app.request_ride(None).await,
        Err(RideError::NotPermitted(AuthError::RoleNotActive { .. }))
    ));
    assert!(app.trips().get_current().is_none());

    app.switch_role(ActiveRole::Passenger).await.unwrap();
    app.request_ride(None).await.unwrap();
    assert_eq!(app.ride().phase(), RidePhase::Searching);
}

#[tokio::test]
async fn test_shift_requires_driver_and_ends_on_logout() {
    let dir = TempDir::new().unwrap();
    let secure = Arc::new(MemorySecureStorage::new());
    let app = signed_out_app(
        &dir,
        MockTripDelivery::new(),
        user(vec![Role::Passenger, Role::Driver]),
        secure,
    )
    .await;
    app.auth().login("kiki@rudix.com", "secret123").await.unwrap();

    assert!(matches!(app.go_online().await, Err(ShiftError::NotPermitted(_))));

    app.switch_role(ActiveRole::Driver).await.unwrap();
    app.go_online().await.unwrap();
    app.driver().accept_request(TripId::new()).unwrap();
    assert_eq!(app.driver().phase(), DriverPhase::EnRoute);

    app.logout().await.unwrap();
    assert_eq!(app.driver().phase(), DriverPhase::Offline);
    assert!(app.driver().current_trip().is_none());
    assert!(app.driver().driver().is_none());
}

#[tokio::test]
async fn test_leaving_driver_role_ends_shift() {
    let dir = TempDir::new().unwrap();
    let secure = Arc::new(MemorySecureStorage::new());
    let app = signed_out_app(
        &dir,
        MockTripDelivery::new(),
        user(vec![Role::Passenger, Role::Driver]),
        secure,
    )
    .await;
    app.auth().login("kiki@rudix.com", "secret123").await.unwrap();
    app.switch_role(ActiveRole::Driver).await.unwrap();
    app.go_online().await.unwrap();

    app.switch_role(ActiveRole::Passenger).await.unwrap();
    assert_eq!(app.driver().phase(), DriverPhase::Offline);
}

#[tokio::test]
async fn test_logout_with_failing_keystore_forgets_token() {
    let dir = TempDir::new().unwrap();
    let secure = Arc::new(MemorySecureStorage::new());
    let app = signed_out_app(&dir, matching_delivery(), passenger(), secure.clone()).await;
    app.auth().login("kiki@rudix.com", "secret123").await.unwrap();

    secure.fail_writes(true);
    assert!(app.logout().await.is_err());

    assert!(app.session_store().get_token().await.unwrap().is_none());
    assert_eq!(app.start().await, Route::LoginOptions);
    assert!(!app.auth().mode().await.is_authenticated());
}

#[tokio::test]
async fn test_notification_feed_loads_and_clears_on_logout() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, matching_delivery()).await;
    assert!(app.notifications().items().is_empty());

    let items: Vec<NotificationItem> = serde_json::from_value(serde_json::json!([
        {
            "id": "1",
            "type": "trip",
            "title": "Viaje completado",
            "message": "Tu viaje a Plaza Carso ha finalizado",
            "time": "2026-10-18T10:00:00Z",
            "read": false,
            "icon": "receipt"
        },
        {
            "id": "2",
            "type": "promo",
            "title": "20% de descuento",
            "message": "En tu próximo viaje",
            "time": "2026-10-17T10:00:00Z",
            "read": true,
            "icon": "gift"
        }
    ]))
    .unwrap();
    app.notifications().replace(items);

    assert_eq!(app.notifications().unread_display(), UnreadDisplay::Count(1));
    assert_eq!(app.notifications().filtered(NotificationFilter::Promos).len(), 1);
    assert!(app.notifications().mark_read("1"));
    assert_eq!(app.notifications().unread_display(), UnreadDisplay::None);

    app.logout().await.unwrap();
    assert!(app.notifications().items().is_empty());
}
