//! The client's view of who is signed in.
//!
//! `SessionState` is created once at start-up and handed by reference to
//! whatever needs it. The current user is derived from the stored
//! credentials through the profile endpoint and published on a watch
//! channel, so front ends see the session drop to unauthenticated when a
//! transparent refresh fails.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::credentials::{Credentials, StorageError};
use super::refresh::RefreshError;
use super::validation::{validate_login, validate_signup, ValidationErrors};
use crate::api::{ApiClient, ApiError};
use crate::models::{AuthResponse, LoginRequest, Profile, SignupRequest};

pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Check credentials.";
pub const SIGNUP_FAILED_MESSAGE: &str = "Signup failed. Try different credentials.";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SessionError {
    /// Human-readable explanation, falling back to `fallback` when the
    /// server gave no message of its own.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            SessionError::Validation(errors) => errors.to_string(),
            SessionError::Api(e) => e
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

impl From<StorageError> for SessionError {
    fn from(e: StorageError) -> Self {
        SessionError::Api(ApiError::Storage(e))
    }
}

pub struct SessionState {
    client: ApiClient,
    user: Arc<watch::Sender<Option<Profile>>>,
}

impl SessionState {
    pub fn new(client: ApiClient) -> Self {
        let (tx, _) = watch::channel(None);
        let user = Arc::new(tx);

        let expired = user.clone();
        client.on_session_expired(Arc::new(move |error: &RefreshError| {
            info!(error = %error, "Session expired, signing out");
            expired.send_replace(None);
        }));

        Self { client, user }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Current user, if signed in
    pub fn user(&self) -> Option<Profile> {
        self.user.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.borrow().is_some()
    }

    /// Observe sign-in, sign-out and session expiry
    pub fn subscribe(&self) -> watch::Receiver<Option<Profile>> {
        self.user.subscribe()
    }

    /// Rebuild the session from stored credentials at start-up.
    pub async fn restore(&self) -> Result<Option<Profile>, StorageError> {
        let user = self.fetch_profile().await?;
        match user {
            Some(ref profile) => info!(username = %profile.username, "Restored session"),
            None => debug!("No session to restore"),
        }
        Ok(user)
    }

    pub async fn login(&self, identifier: &str, password: &str) -> Result<Profile, SessionError> {
        validate_login(identifier, password)?;
        let request = LoginRequest {
            username_or_email: identifier.trim().to_string(),
            password: password.to_string(),
        };
        let auth = self.client.login(&request).await?;
        self.establish(auth).await
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Profile, SessionError> {
        validate_signup(username, email, password)?;
        let request = SignupRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth = self.client.signup(&request).await?;
        self.establish(auth).await
    }

    /// Forget the session locally. No network call is made.
    ///
    /// Requests waiting on an in-flight refresh fail with `SessionReset`.
    pub fn logout(&self) -> Result<(), StorageError> {
        let cleared = self.client.install_credentials(None);
        self.user.send_replace(None);
        info!("Logged out");
        cleared
    }

    /// Load the profile for the stored credentials.
    ///
    /// Any API failure, including a failed transparent refresh, leaves the
    /// session unauthenticated. Only storage failures are returned.
    pub async fn fetch_profile(&self) -> Result<Option<Profile>, StorageError> {
        if self.client.credentials()?.access_token().is_none() {
            self.user.send_replace(None);
            return Ok(None);
        }

        match self.client.me().await {
            Ok(profile) => {
                self.user.send_replace(Some(profile.clone()));
                Ok(Some(profile))
            }
            Err(ApiError::Storage(e)) => Err(e),
            Err(e) => {
                warn!(error = %e, "Profile fetch failed, treating session as signed out");
                self.user.send_replace(None);
                Ok(None)
            }
        }
    }

    async fn establish(&self, auth: AuthResponse) -> Result<Profile, SessionError> {
        info!(role = %auth.role, "Authenticated");
        self.client
            .install_credentials(Some(&Credentials::from(auth)))?;

        match self.client.me().await {
            Ok(profile) => {
                self.user.send_replace(Some(profile.clone()));
                Ok(profile)
            }
            Err(e) => {
                self.user.send_replace(None);
                Err(e.into())
            }
        }
    }
}
