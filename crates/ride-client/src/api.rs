//! HTTP API client
//!
//! Thin JSON-over-HTTP client shared by the auth API and trip delivery
//! implementations. Requests carry an optional bearer token; non-2xx responses
//! are mapped to [`Error::Api`] (or [`Error::Auth`] for 401).

use reqwest::{Client as ReqwestClient, RequestBuilder, Response as ReqwestResponse, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::{Error, Result};

/// API client configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend (e.g., "https://api.rudix.com")
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Headers added to every request
    pub default_headers: HashMap<String, String>,
}

impl ApiConfig {
    /// Create a configuration for the given backend
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("rudix/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
        }
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }
}

/// Error envelope returned by the backend
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<ApiErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// JSON API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: ReqwestClient,
    config: ApiConfig,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// GET a JSON resource
    pub async fn get<T>(&self, path: &str, token: Option<&str>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(self.client.get(self.url(path)), token).await?;
        Self::parse_json(response).await
    }

    /// GET a JSON resource, mapping 404 to `None`
    pub async fn get_optional<T>(&self, path: &str, token: Option<&str>) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let request = self.authorize(self.client.get(self.url(path)), token);
        let response = request.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check_status(response).await?;
        Self::parse_json(response).await.map(Some)
    }

    /// POST a JSON body and parse the JSON response
    pub async fn post<B, T>(&self, path: &str, body: &B, token: Option<&str>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.url(path)).json(body);
        let response = self.send(request, token).await?;
        Self::parse_json(response).await
    }

    /// POST without a body, ignoring the response payload
    pub async fn post_empty(&self, path: &str, token: Option<&str>) -> Result<()> {
        self.send(self.client.post(self.url(path)), token).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, mut request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        for (key, value) in &self.config.default_headers {
            request = request.header(key, value);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn send(&self, request: RequestBuilder, token: Option<&str>) -> Result<ReqwestResponse> {
        let response = self.authorize(request, token).send().await?;
        Self::check_status(response).await
    }

    async fn check_status(response: ReqwestResponse) -> Result<ReqwestResponse> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(ApiErrorBody { error: Some(detail), .. }) => detail.message,
            Ok(ApiErrorBody { message: Some(message), .. }) => message,
            _ => format!("HTTP {}: {}", status.as_u16(), body),
        };

        tracing::debug!(status = status.as_u16(), %message, "API request failed");

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Auth(message));
        }

        Err(Error::Api { status: status.as_u16(), message })
    }

    async fn parse_json<T>(response: ReqwestResponse) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
