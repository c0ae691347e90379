//! Session restore across client restarts
//!
//! Each test bootstraps the real client (sled storage in a temp directory,
//! HTTP collaborators) against a wiremock backend, then bootstraps it again
//! over the same data directory to simulate an app restart.

use app_core::ActiveRole;
use app_ui::Route;
use rudix::{AppConfig, RudixApp};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_json(roles: &[&str]) -> serde_json::Value {
    json!({
        "id": "u-42",
        "nombres": "Kiki",
        "apellidos": "Mock",
        "email": "kiki@rudix.com",
        "telefono": "+123456789",
        "roles": roles
    })
}

async fn mount_login(server: &MockServer, roles: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_json(roles),
            "token": "tok-abc",
            "success": true
        })))
        .mount(server)
        .await;
}

fn config(server: &MockServer, dir: &TempDir) -> AppConfig {
    AppConfig::default().api_url(server.uri()).data_dir(dir.path())
}

async fn login_and_close(server: &MockServer, dir: &TempDir) {
    let app = RudixApp::bootstrap(config(server, dir)).await.unwrap();
    assert_eq!(app.start().await, Route::LoginOptions);

    app.auth().login("kiki@rudix.com", "secret123").await.unwrap();
    assert_eq!(app.navigate(Route::LoginOptions).await, Route::PassengerHome);
}

#[tokio::test]
async fn test_driver_resumes_in_driver_role() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_login(&server, &["user", "driver"]).await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("Authorization", "Bearer tok-abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"user": user_json(&["user", "driver"])})),
        )
        .expect(1)
        .mount(&server)
        .await;

    login_and_close(&server, &dir).await;

    let app = RudixApp::bootstrap(config(&server, &dir)).await.unwrap();
    assert_eq!(app.start().await, Route::DriverHome);
    assert_eq!(app.auth().mode().await.role(), Some(ActiveRole::Driver));

    app.auth().switch_role(ActiveRole::Passenger).await.unwrap();
    assert_eq!(app.navigate(Route::LoginOptions).await, Route::PassengerHome);
}

#[tokio::test]
async fn test_rejected_token_is_discarded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_login(&server, &["user"]).await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "TOKEN_EXPIRED", "message": "Token expirado"}
        })))
        .mount(&server)
        .await;

    login_and_close(&server, &dir).await;

    let app = RudixApp::bootstrap(config(&server, &dir)).await.unwrap();
    assert_eq!(app.start().await, Route::LoginOptions);
    assert!(app.session_store().get_token().await.unwrap().is_none());
}

#[tokio::test]
async fn test_unreachable_backend_keeps_token() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_login(&server, &["user"]).await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    login_and_close(&server, &dir).await;

    let app = RudixApp::bootstrap(config(&server, &dir)).await.unwrap();
    assert_eq!(app.start().await, Route::LoginOptions);
    assert_eq!(app.session_store().get_token().await.unwrap().as_deref(), Some("tok-abc"));
}

#[tokio::test]
async fn test_logout_survives_restart() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_login(&server, &["user"]).await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("Authorization", "Bearer tok-abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    {
        let app = RudixApp::bootstrap(config(&server, &dir)).await.unwrap();
        app.auth().login("kiki@rudix.com", "secret123").await.unwrap();
        app.logout().await.unwrap();
    }

    let app = RudixApp::bootstrap(config(&server, &dir)).await.unwrap();
    assert!(app.session_store().get_token().await.unwrap().is_none());
    assert_eq!(app.start().await, Route::LoginOptions);
}
