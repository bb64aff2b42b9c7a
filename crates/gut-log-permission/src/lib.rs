#![warn(missing_docs)]
//! # gut-log-permission
//!
//! ## Purpose
//! Owns the camera-authorization view used to gate capture.
//!
//! ## Responsibilities
//! - Read and request camera permission through an injectable
//!   [`PermissionProvider`] (the platform permission store).
//! - Refuse capture while the state is anything other than granted.
//!
//! ## Data flow
//! Capture screen asks [`PermissionGate::ensure_granted`] -> on refusal the UI
//! offers a retry button -> user taps it -> [`PermissionGate::request_permission`]
//! suspends until the platform answers.
//!
//! ## Error model
//! Refusals surface as [`PermissionError`]. They are recoverable only through an
//! explicit user re-request; the gate never retries on its own.
//!
//! ## Example
//! ```rust
//! use gut_log_permission::{PermissionState, StaticPermissionProvider};
//!
//! let provider = StaticPermissionProvider::new(PermissionState::Unknown, PermissionState::Granted);
//! assert_eq!(provider.request_count(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Camera authorization as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    /// User has not answered a prompt yet.
    #[default]
    Unknown,
    /// User refused camera access.
    Denied,
    /// Camera access is allowed.
    Granted,
}

impl PermissionState {
    /// Returns `true` only for [`PermissionState::Granted`].
    pub fn is_granted(self) -> bool {
        self == PermissionState::Granted
    }
}

/// Platform permission store.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Reads the current state without prompting.
    async fn current(&self) -> PermissionState;

    /// Prompts the user and suspends until the platform responds.
    async fn request(&self) -> PermissionState;
}

/// Capture gate over a platform permission store.
#[derive(Clone)]
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    last_known: Arc<Mutex<PermissionState>>,
}

impl PermissionGate {
    /// Creates a gate; the cached state starts as unknown.
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        Self {
            provider,
            last_known: Arc::new(Mutex::new(PermissionState::Unknown)),
        }
    }

    /// Reads the platform state without prompting.
    pub async fn query_permission(&self) -> PermissionState {
        let state = self.provider.current().await;
        self.record(state);
        state
    }

    /// Prompts for camera access. Only ever called from a user action.
    pub async fn request_permission(&self) -> PermissionState {
        debug!(target: "gut_log::permission", "requesting camera permission");
        let state = self.provider.request().await;
        self.record(state);
        state
    }

    /// Returns the state observed by the most recent query or request.
    pub fn last_known(&self) -> PermissionState {
        *self
            .last_known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks that capture may proceed.
    ///
    /// # Errors
    /// Returns [`PermissionError::Denied`] or [`PermissionError::NotRequested`]
    /// when the platform state is not granted.
    pub async fn ensure_granted(&self) -> Result<(), PermissionError> {
        match self.query_permission().await {
            PermissionState::Granted => Ok(()),
            PermissionState::Denied => Err(PermissionError::Denied),
            PermissionState::Unknown => Err(PermissionError::NotRequested),
        }
    }

    fn record(&self, state: PermissionState) {
        let mut last_known = self
            .last_known
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *last_known != state {
            debug!(
                target: "gut_log::permission",
                from = ?*last_known,
                to = ?state,
                "camera permission changed"
            );
        }
        *last_known = state;
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("last_known", &self.last_known())
            .finish_non_exhaustive()
    }
}

/// Deterministic provider for tests and the command-line shell.
///
/// A request moves the state to the configured answer unless access is
/// already granted.
#[derive(Debug)]
pub struct StaticPermissionProvider {
    state: Mutex<PermissionState>,
    answer: PermissionState,
    requests: AtomicUsize,
}

impl StaticPermissionProvider {
    /// Creates a provider with an initial state and the answer given to every prompt.
    pub fn new(initial: PermissionState, answer: PermissionState) -> Self {
        Self {
            state: Mutex::new(initial),
            answer,
            requests: AtomicUsize::new(0),
        }
    }

    /// Provider that is already granted.
    pub fn granted() -> Self {
        Self::new(PermissionState::Granted, PermissionState::Granted)
    }

    /// Number of prompts shown so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionProvider for StaticPermissionProvider {
    async fn current(&self) -> PermissionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn request(&self) -> PermissionState {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.is_granted() {
            *state = self.answer;
        }
        *state
    }
}

/// Capture refusals caused by camera authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// User refused camera access.
    #[error("camera permission denied")]
    Denied,
    /// Camera access has not been requested yet.
    #[error("camera permission has not been requested")]
    NotRequested,
}
