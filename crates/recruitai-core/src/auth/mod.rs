//! Authentication module for managing sessions and credentials.
//!
//! This module provides:
//! - `CredentialStore`: persistent storage for the access/refresh token pair
//! - `RefreshCoordinator`: single-flight token refresh shared by all requests
//! - `SessionState`: the current user, with login, signup and logout
//! - `validation`: input checks performed before any network call

pub mod credentials;
pub mod refresh;
pub mod session;
pub mod validation;

pub use credentials::{
    CredentialStore, Credentials, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore, StorageError,
};
pub use refresh::{ExpiryListener, RefreshCoordinator, RefreshError, RefreshResult};
pub use session::{SessionError, SessionState};
pub use validation::{FieldError, SignupForm, ValidationErrors};
