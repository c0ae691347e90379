//! Auth API
//!
//! Request/response contracts for the backend's `/auth` endpoints, the
//! [`AuthApi`] seam consumed by the auth session, and its HTTP implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::user::User;
use crate::Result;

/// `POST /auth/login`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

/// `POST /auth/register`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Given names
    pub nombres: String,
    /// Family names
    pub apellidos: String,
    /// Email address
    pub email: String,
    /// Phone number
    pub telefono: String,
    /// Password
    pub password: String,
}

/// `POST /auth/send-otp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendOtpRequest {
    /// Phone number receiving the code
    pub telefono: String,
}

/// Response to `POST /auth/send-otp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendOtpResponse {
    /// Server message
    pub message: String,
    /// Whether the code was sent
    #[serde(default = "default_success")]
    pub success: bool,
}

/// `POST /auth/verify-otp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    /// Phone number the code was sent to
    pub telefono: String,
    /// One-time code
    pub code: String,
}

/// Response to login, register and OTP verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// The authenticated user
    pub user: User,
    /// Session token
    pub token: String,
    /// Refresh token (not persisted by this client)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Whether the request succeeded
    #[serde(default = "default_success")]
    pub success: bool,
}

/// Response to `GET /auth/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CurrentUserResponse {
    user: User,
}

fn default_success() -> bool {
    true
}

/// Backend authentication entry points
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Log in with email and password
    async fn login(&self, request: LoginRequest) -> Result<LoginResponse>;

    /// Create an account
    async fn register(&self, request: RegisterRequest) -> Result<LoginResponse>;

    /// Send a one-time code to a phone number
    async fn send_otp(&self, request: SendOtpRequest) -> Result<SendOtpResponse>;

    /// Verify a one-time code and log in
    async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<LoginResponse>;

    /// Fetch the user owning a session token
    async fn current_user(&self, token: &str) -> Result<User>;

    /// Invalidate a session token server-side
    async fn logout(&self, token: &str) -> Result<()>;
}

/// [`AuthApi`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: ApiClient,
}

impl HttpAuthApi {
    /// Create an auth API backed by the given client
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        self.client.post("/auth/login", &request, None).await
    }

    async fn register(&self, request: RegisterRequest) -> Result<LoginResponse> {
        self.client.post("/auth/register", &request, None).await
    }

    async fn send_otp(&self, request: SendOtpRequest) -> Result<SendOtpResponse> {
        self.client.post("/auth/send-otp", &request, None).await
    }

    async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<LoginResponse> {
        self.client.post("/auth/verify-otp", &request, None).await
    }

    async fn current_user(&self, token: &str) -> Result<User> {
        let response: CurrentUserResponse = self.client.get("/auth/me", Some(token)).await?;
        Ok(response.user)
    }

    async fn logout(&self, token: &str) -> Result<()> {
        self.client.post_empty("/auth/logout", Some(token)).await
    }
}
