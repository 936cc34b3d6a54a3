//! Single-flight access token refresh.
//!
//! When several requests are rejected with 401 at the same time, only the
//! first one (the leader) exchanges the refresh token. Everyone else queues
//! a waiter and receives the leader's outcome once it settles. The queue is
//! drained in one step under the lock, and the `refreshing` flag is released
//! on every exit path, including cancellation of the leader's future.
//!
//! Every reset of the session (login, signup, logout) bumps a generation
//! counter. A refresh that settles after a reset belongs to a stale
//! generation and is discarded without touching the store.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::credentials::{CredentialStore, Credentials, StorageError};
use crate::models::AuthResponse;

/// Outcome handed to the leader and every queued waiter.
pub type RefreshResult = Result<String, RefreshError>;

/// Callback fired once per failed refresh, after the store has been cleared.
pub type ExpiryListener = Arc<dyn Fn(&RefreshError) + Send + Sync>;

/// Why a refresh did not produce a new access token.
///
/// Cloneable so the same failure can be delivered to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Refresh rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error during refresh: {0}")]
    Network(String),

    #[error("Refresh timed out")]
    TimedOut,

    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error("Credential storage failed during refresh: {0}")]
    Storage(String),

    #[error("Session was reset while the refresh was in flight")]
    SessionReset,

    #[error("Refresh was interrupted before it settled")]
    Interrupted,
}

impl From<StorageError> for RefreshError {
    fn from(e: StorageError) -> Self {
        RefreshError::Storage(e.to_string())
    }
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    generation: u64,
    waiters: Vec<oneshot::Sender<RefreshResult>>,
}

enum Ticket {
    Leader(u64),
    Waiter(oneshot::Receiver<RefreshResult>),
}

#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    expiry_listener: Mutex<Option<ExpiryListener>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the callback fired when a refresh fails and the session is lost.
    pub fn set_expiry_listener(&self, listener: ExpiryListener) {
        *self
            .expiry_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Number of callers currently queued behind the in-flight refresh.
    pub fn pending_waiters(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Obtain a fresh access token.
    ///
    /// The first caller runs `exchange` with the stored refresh token; callers
    /// arriving while it is in flight wait for its outcome instead. A missing
    /// refresh token fails without calling `exchange`. On success the new
    /// tokens are stored; on failure the store is cleared.
    pub async fn refresh<F, Fut>(&self, store: &dyn CredentialStore, exchange: F) -> RefreshResult
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<AuthResponse, RefreshError>>,
    {
        let generation = match self.enter() {
            Ticket::Leader(generation) => generation,
            Ticket::Waiter(rx) => {
                debug!("Refresh already in flight, waiting");
                return rx.await.unwrap_or(Err(RefreshError::Interrupted));
            }
        };

        let in_flight = InFlight {
            coordinator: self,
            generation,
            settled: false,
        };

        info!("Refreshing access token");
        let outcome = match store.get() {
            Ok(credentials) => match credentials.refresh_token() {
                Some(refresh_token) => exchange(refresh_token.to_string()).await,
                None => Err(RefreshError::MissingRefreshToken),
            },
            Err(e) => Err(e.into()),
        };

        in_flight.settle(store, outcome)
    }

    /// Start a new session generation.
    ///
    /// Queued waiters fail with `SessionReset` and an in-flight refresh will
    /// be discarded when it settles. The store then holds `replacement`, or
    /// nothing. The write happens under the lock so it is ordered against
    /// a settling refresh.
    pub(crate) fn reset(
        &self,
        store: &dyn CredentialStore,
        replacement: Option<&Credentials>,
    ) -> Result<(), StorageError> {
        let mut state = self.lock();
        state.generation += 1;
        if state.refreshing {
            debug!(waiters = state.waiters.len(), "Abandoning in-flight refresh");
        }
        state.refreshing = false;
        let waiters = std::mem::take(&mut state.waiters);
        let written = match replacement {
            Some(credentials) => store.set(credentials),
            None => store.clear(),
        };
        drop(state);

        for waiter in waiters {
            let _ = waiter.send(Err(RefreshError::SessionReset));
        }
        written
    }

    fn enter(&self) -> Ticket {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            Ticket::Waiter(rx)
        } else {
            state.refreshing = true;
            Ticket::Leader(state.generation)
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_expired(&self, error: &RefreshError) {
        let listener = self
            .expiry_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(listener) = listener {
            listener(error);
        }
    }
}

/// Leadership of one refresh. Dropping it unsettled releases the flag.
struct InFlight<'a> {
    coordinator: &'a RefreshCoordinator,
    generation: u64,
    settled: bool,
}

impl InFlight<'_> {
    /// Store the outcome and release the flag and every waiter.
    ///
    /// The lock is held across the store write so that a concurrent
    /// `reset` cannot interleave between the generation check and the
    /// write. `settled` is only set once the flag is released; if the
    /// store panics, `Drop` still frees the flag and the waiters.
    fn settle(
        mut self,
        store: &dyn CredentialStore,
        outcome: Result<AuthResponse, RefreshError>,
    ) -> RefreshResult {
        let mut state = self.coordinator.lock();
        if state.generation != self.generation {
            self.settled = true;
            debug!("Discarding refresh result from a previous session");
            return Err(RefreshError::SessionReset);
        }

        let result = outcome.and_then(|tokens| {
            let credentials = Credentials::from(tokens);
            store.set(&credentials)?;
            Ok(credentials.access_token)
        });
        if let Err(ref e) = result {
            warn!(error = %e, "Token refresh failed, clearing credentials");
            if let Err(clear_err) = store.clear() {
                warn!(error = %clear_err, "Failed to clear credentials after refresh failure");
            }
        }

        state.refreshing = false;
        let waiters = std::mem::take(&mut state.waiters);
        drop(state);
        self.settled = true;

        debug!(waiters = waiters.len(), success = result.is_ok(), "Releasing refresh waiters");
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
        if let Err(ref e) = result {
            self.coordinator.notify_expired(e);
        }
        result
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.coordinator.lock();
        if state.generation != self.generation {
            return;
        }
        warn!("Token refresh interrupted before settling");
        state.refreshing = false;
        let waiters = std::mem::take(&mut state.waiters);
        drop(state);
        for waiter in waiters {
            let _ = waiter.send(Err(RefreshError::Interrupted));
        }
    }
}
