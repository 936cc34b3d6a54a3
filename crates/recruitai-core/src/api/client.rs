//! API client for communicating with the RecruitAI REST API.
//!
//! Every authenticated request picks up the current access token from the
//! credential store at send time. A 401 response triggers one transparent
//! token refresh (shared with any other request that failed at the same
//! time) and a single replay of the original request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{
    CredentialStore, Credentials, ExpiryListener, RefreshCoordinator, RefreshError, StorageError,
};
use crate::config::Config;
use crate::models::{AuthResponse, LoginRequest, Profile, RefreshRequest, SignupRequest};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/auth/login";
const SIGNUP_PATH: &str = "/auth/signup";
const REFRESH_PATH: &str = "/auth/refresh";
const PROFILE_PATH: &str = "/users/me";

/// Maximum number of retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// A single outbound call.
///
/// `retried` is the one-shot marker: it is set before the request is
/// replayed after a refresh, and a marked request is never refreshed again.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            retried: false,
        }
    }

    pub fn post<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self, ApiError> {
        Ok(Self {
            method: Method::POST,
            path: path.into(),
            body: Some(serde_json::to_value(body)?),
            retried: false,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

/// API client for RecruitAI.
/// Clone is cheap - the connection pool, store and refresh state are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    store: Arc<dyn CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    refresh_timeout: Duration,
}

impl ApiClient {
    /// Create a new API client backed by `store`
    pub fn new(config: &Config, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').into(),
            store,
            coordinator: Arc::new(RefreshCoordinator::new()),
            refresh_timeout: config.refresh_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current stored credentials. Writes go through the session.
    pub fn credentials(&self) -> Result<Credentials, StorageError> {
        self.store.get()
    }

    pub fn credential_store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Register the callback fired when a transparent refresh fails.
    pub fn on_session_expired(&self, listener: ExpiryListener) {
        self.coordinator.set_expiry_listener(listener);
    }

    /// Replace (or clear) the stored credentials, abandoning any refresh in flight.
    pub(crate) fn install_credentials(
        &self,
        credentials: Option<&Credentials>,
    ) -> Result<(), StorageError> {
        self.coordinator.reset(self.store.as_ref(), credentials)
    }

    // ===== Auth Endpoints =====

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.execute_anonymous(ApiRequest::post(LOGIN_PATH, request)?)
            .await
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
        self.execute_anonymous(ApiRequest::post(SIGNUP_PATH, request)?)
            .await
    }

    /// Fetch the signed-in user's profile
    pub async fn me(&self) -> Result<Profile, ApiError> {
        self.get(PROFILE_PATH).await
    }

    // ===== Generic Requests =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(ApiRequest::post(path, body)?).await
    }

    /// Send an authenticated request, refreshing the token once on 401.
    pub async fn execute<T: DeserializeOwned>(&self, mut request: ApiRequest) -> Result<T, ApiError> {
        let credentials = self.store.get()?;
        let response = self.dispatch(&request, credentials.access_token()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || request.retried {
            return Self::decode(response, &request).await;
        }

        request.retried = true;
        debug!(path = %request.path, "Access token rejected, refreshing");
        let token = self.refresh_access_token().await?;
        let response = self.dispatch(&request, Some(&token)).await?;
        Self::decode(response, &request).await
    }

    /// Send a request without credentials and without refresh handling.
    async fn execute_anonymous<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.dispatch(&request, None).await?;
        Self::decode(response, &request).await
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Concurrent callers share a single call to the refresh endpoint.
    pub async fn refresh_access_token(&self) -> Result<String, ApiError> {
        let token = self
            .coordinator
            .refresh(self.store.as_ref(), |refresh_token| {
                self.exchange_refresh_token(refresh_token)
            })
            .await?;
        Ok(token)
    }

    async fn exchange_refresh_token(&self, refresh_token: String) -> Result<AuthResponse, RefreshError> {
        let body = RefreshRequest { refresh_token };
        let url = self.url(REFRESH_PATH);

        let call = async {
            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| RefreshError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let error = ApiError::from_status(status, &text);
                let message = error
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                return Err(RefreshError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }

            response
                .json::<AuthResponse>()
                .await
                .map_err(|e| RefreshError::InvalidResponse(e.to_string()))
        };

        tokio::time::timeout(self.refresh_timeout, call)
            .await
            .unwrap_or(Err(RefreshError::TimedOut))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send once, backing off and resending while the server answers 429.
    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;
        let url = self.url(&request.path);

        loop {
            let mut builder = self.client.request(request.method.clone(), &url);
            if let Some(token) = token {
                builder = builder.bearer_auth(token);
            }
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited);
            }
            warn!(path = %request.path, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2; // Exponential backoff
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response, request: &ApiRequest) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| {
                ApiError::InvalidResponse(format!(
                    "Failed to parse JSON response from {}: {}",
                    request.path, e
                ))
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryCredentialStore;

    fn client_for(base: &str) -> ApiClient {
        let config = Config {
            api_base: base.to_string(),
            ..Config::default()
        };
        ApiClient::new(&config, Arc::new(MemoryCredentialStore::new())).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = client_for("http://localhost:8080/api/");
        assert_eq!(client.base_url(), "http://localhost:8080/api");
        assert_eq!(client.url("/users/me"), "http://localhost:8080/api/users/me");
    }

    #[test]
    fn test_new_request_is_not_retried() {
        let request = ApiRequest::get("/users/me");
        assert!(!request.is_retried());
        assert_eq!(request.path(), "/users/me");
    }

    #[test]
    fn test_post_request_serializes_body() {
        let body = RefreshRequest {
            refresh_token: "R1".to_string(),
        };
        let request = ApiRequest::post("/auth/refresh", &body).unwrap();
        assert_eq!(request.body.as_ref().unwrap()["refreshToken"], "R1");
    }
}
