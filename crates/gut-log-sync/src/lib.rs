#![warn(missing_docs)]
//! # gut-log-sync
//!
//! ## Purpose
//! Keeps the client's copies of server-derived views in step with screen
//! focus.
//!
//! ## Responsibilities
//! - Fetch raw bodies through an injectable [`FeedSource`].
//! - Run one [`FeedSynchronizer`] per [`Feed`] (weekly stats, tip, calendar
//!   density), each with its own state machine:
//!   `Stale -> Fetching -> {Fresh | StaleWithError}`.
//! - Keep the last good value when a fetch fails and log the failure instead
//!   of surfacing it.
//!
//! ## Data flow
//! Screen focus -> [`FeedSynchronizer::refresh`] -> [`FeedSource::get`] ->
//! [`Feed::decode`] -> projection replaced wholesale.
//!
//! ## Concurrency
//! Synchronizers take `&self` and hold their lock only between suspension
//! points, so several feeds can be awaited together on one thread. A refresh
//! that finds its own feed already fetching returns
//! [`RefreshOutcome::AlreadyInFlight`] without touching the network. A
//! response that lands after the screen lost focus is still applied.
//!
//! ## Error model
//! Every failure becomes a [`FetchError`] stored on the synchronizer for
//! diagnostics. None of them is fatal.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use gut_log_api::{
    ApiConfig, ApiError, ArchivedLog, CALENDAR_PATH, HEALTH_PATH, HISTORY_PATH, HealthResponse,
    TIPS_PATH, WEEKLY_PATH, parse_archive, parse_calendar, parse_health, parse_tip, parse_weekly,
};
use gut_log_core::{CalendarDensity, EXPECTED_WEEK_LEN, FeedKind, Tip, WeeklyStats};
use thiserror::Error;
use tracing::{debug, warn};

/// Generic HTTP `GET` capability.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches the body at `path`.
    ///
    /// # Errors
    /// Returns [`FetchError`] for transport failures and non-success statuses.
    async fn get(&self, path: &str) -> Result<Vec<u8>, FetchError>;
}

/// `reqwest`-backed feed source.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpFeedSource {
    /// Builds a source for `config`.
    ///
    /// # Errors
    /// Returns [`FetchError::Setup`] when the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|error| FetchError::Setup(error.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn get(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(self.config.endpoint(path))
            .send()
            .await
            .map_err(error_from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(error_from_reqwest)?;
        Ok(body.to_vec())
    }
}

fn error_from_reqwest(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(error.to_string())
    }
}

/// One server-derived view.
pub trait Feed: Send + Sync + 'static {
    /// Feed identity.
    const KIND: FeedKind;
    /// Endpoint path.
    const PATH: &'static str;
    /// Projection held by the synchronizer.
    type Value: Clone + Default + Send + Sync + 'static;

    /// Decodes a response body into a fresh projection.
    ///
    /// # Errors
    /// Returns [`FetchError`] when the body cannot replace the current value.
    fn decode(body: &[u8]) -> Result<Self::Value, FetchError>;
}

/// Weekly log window feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeeklyFeed;

impl Feed for WeeklyFeed {
    const KIND: FeedKind = FeedKind::WeeklyStats;
    const PATH: &'static str = WEEKLY_PATH;
    type Value = WeeklyStats;

    fn decode(body: &[u8]) -> Result<Self::Value, FetchError> {
        let stats = parse_weekly(body)?;
        if !stats.is_full_week() {
            debug!(
                target: "gut_log::sync",
                entries = stats.len(),
                expected = EXPECTED_WEEK_LEN,
                "weekly window has an unusual length"
            );
        }
        Ok(stats)
    }
}

/// Daily tip feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TipFeed;

impl Feed for TipFeed {
    const KIND: FeedKind = FeedKind::Tip;
    const PATH: &'static str = TIPS_PATH;
    type Value = Tip;

    fn decode(body: &[u8]) -> Result<Self::Value, FetchError> {
        Ok(parse_tip(body)?)
    }
}

/// Calendar density feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarFeed;

impl Feed for CalendarFeed {
    const KIND: FeedKind = FeedKind::CalendarDensity;
    const PATH: &'static str = CALENDAR_PATH;
    type Value = CalendarDensity;

    fn decode(body: &[u8]) -> Result<Self::Value, FetchError> {
        Ok(parse_calendar(body)?)
    }
}

/// Freshness of one feed's projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedPhase {
    /// No successful fetch yet; projection holds its default.
    #[default]
    Stale,
    /// A fetch is in flight.
    Fetching,
    /// Last fetch succeeded.
    Fresh,
    /// Last fetch failed; projection holds the previous value.
    StaleWithError,
}

/// Result of one [`FeedSynchronizer::refresh`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Projection was replaced.
    Updated,
    /// Fetch failed; previous projection retained.
    Degraded(FetchError),
    /// A fetch for this feed was already running; nothing was sent.
    AlreadyInFlight,
}

/// Diagnostic snapshot of one synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStatus {
    /// Feed identity.
    pub kind: FeedKind,
    /// Current phase.
    pub phase: FeedPhase,
    /// Number of successful replacements so far.
    pub updates: u64,
    /// Most recent failure, cleared by the next success.
    pub last_error: Option<FetchError>,
}

struct FeedState<V> {
    phase: FeedPhase,
    value: V,
    updates: u64,
    last_error: Option<FetchError>,
}

/// Fetch-on-focus synchronizer for one feed.
pub struct FeedSynchronizer<F: Feed> {
    source: Arc<dyn FeedSource>,
    state: Mutex<FeedState<F::Value>>,
    _feed: PhantomData<fn() -> F>,
}

impl<F: Feed> FeedSynchronizer<F> {
    /// Creates a stale synchronizer holding the feed's default value.
    pub fn new(source: Arc<dyn FeedSource>) -> Self {
        Self {
            source,
            state: Mutex::new(FeedState {
                phase: FeedPhase::Stale,
                value: F::Value::default(),
                updates: 0,
                last_error: None,
            }),
            _feed: PhantomData,
        }
    }

    /// Fetches once and applies the outcome.
    ///
    /// Call this from whatever focus hook the shell exposes.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(mut in_flight) = self.begin() else {
            debug!(
                target: "gut_log::sync",
                feed = F::KIND.as_str(),
                "refresh ignored, fetch already in flight"
            );
            return RefreshOutcome::AlreadyInFlight;
        };

        debug!(target: "gut_log::sync", feed = F::KIND.as_str(), path = F::PATH, "fetch started");
        let decoded = match self.source.get(F::PATH).await {
            Ok(body) => F::decode(&body),
            Err(error) => Err(error),
        };

        in_flight.settled = true;
        let mut state = self.lock();
        match decoded {
            Ok(value) => {
                state.value = value;
                state.phase = FeedPhase::Fresh;
                state.updates += 1;
                state.last_error = None;
                debug!(target: "gut_log::sync", feed = F::KIND.as_str(), "projection replaced");
                RefreshOutcome::Updated
            }
            Err(error) => {
                warn!(
                    target: "gut_log::sync",
                    feed = F::KIND.as_str(),
                    %error,
                    "fetch failed, keeping previous projection"
                );
                state.phase = FeedPhase::StaleWithError;
                state.last_error = Some(error.clone());
                RefreshOutcome::Degraded(error)
            }
        }
    }

    /// Clone of the current projection.
    pub fn snapshot(&self) -> F::Value {
        self.lock().value.clone()
    }

    /// Current phase.
    pub fn phase(&self) -> FeedPhase {
        self.lock().phase
    }

    /// Most recent failure, if the last fetch failed.
    pub fn last_error(&self) -> Option<FetchError> {
        self.lock().last_error.clone()
    }

    /// Diagnostic snapshot.
    pub fn status(&self) -> FeedStatus {
        let state = self.lock();
        FeedStatus {
            kind: F::KIND,
            phase: state.phase,
            updates: state.updates,
            last_error: state.last_error.clone(),
        }
    }

    fn begin(&self) -> Option<InFlight<'_, F::Value>> {
        let mut state = self.lock();
        if state.phase == FeedPhase::Fetching {
            return None;
        }
        let restore = state.phase;
        state.phase = FeedPhase::Fetching;
        Some(InFlight {
            state: &self.state,
            restore,
            settled: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, FeedState<F::Value>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F: Feed> std::fmt::Debug for FeedSynchronizer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSynchronizer")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

// Puts the phase back if a refresh future is dropped mid-fetch, so the
// in-flight guard cannot wedge the feed.
struct InFlight<'a, V> {
    state: &'a Mutex<FeedState<V>>,
    restore: FeedPhase,
    settled: bool,
}

impl<V> Drop for InFlight<'_, V> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.phase == FeedPhase::Fetching {
            state.phase = self.restore;
        }
    }
}

/// Reads the service health probe.
///
/// # Errors
/// Returns [`FetchError`] for transport, status, or decode failures.
pub async fn fetch_health(source: &dyn FeedSource) -> Result<HealthResponse, FetchError> {
    let body = source.get(HEALTH_PATH).await?;
    Ok(parse_health(&body)?)
}

/// Reads the full log archive in server order.
///
/// # Errors
/// Returns [`FetchError`] for transport, status, or decode failures.
pub async fn fetch_archive(source: &dyn FeedSource) -> Result<Vec<ArchivedLog>, FetchError> {
    let body = source.get(HISTORY_PATH).await?;
    Ok(parse_archive(&body)?)
}

/// Feed fetch failures. Logged, never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// HTTP client could not be built.
    #[error("fetch setup failure: {0}")]
    Setup(String),
    /// Connection-level failure.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Request timed out.
    #[error("request timed out")]
    Timeout,
    /// Non-success status.
    #[error("unexpected status {0}")]
    Status(u16),
    /// Body could not be decoded.
    #[error("decode failure: {0}")]
    Decode(String),
    /// Body lacked a field the projection needs.
    #[error("response is missing field `{0}`")]
    MissingField(&'static str),
}

impl From<ApiError> for FetchError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::MissingField(field) => FetchError::MissingField(field),
            other => FetchError::Decode(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for phase transitions against a scripted source.

    use super::*;

    struct FixedSource(Result<&'static str, FetchError>);

    #[async_trait]
    impl FeedSource for FixedSource {
        async fn get(&self, _path: &str) -> Result<Vec<u8>, FetchError> {
            self.0.clone().map(|body| body.as_bytes().to_vec())
        }
    }

    #[tokio::test]
    async fn starts_stale_with_placeholder() {
        let sync = FeedSynchronizer::<TipFeed>::new(Arc::new(FixedSource(Err(
            FetchError::Status(500),
        ))));
        assert_eq!(sync.phase(), FeedPhase::Stale);
        assert!(sync.snapshot().is_placeholder());

        assert_eq!(
            sync.refresh().await,
            RefreshOutcome::Degraded(FetchError::Status(500))
        );
        assert_eq!(sync.phase(), FeedPhase::StaleWithError);
        assert!(sync.snapshot().is_placeholder());
    }

    #[tokio::test]
    async fn fresh_after_success() {
        let sync = FeedSynchronizer::<TipFeed>::new(Arc::new(FixedSource(Ok(
            r#"{"status":"Healthy","tip":"Good job yesterday!"}"#,
        ))));
        assert_eq!(sync.refresh().await, RefreshOutcome::Updated);
        assert_eq!(sync.phase(), FeedPhase::Fresh);
        assert_eq!(sync.status().updates, 1);
        assert_eq!(sync.snapshot().status, "Healthy");
    }
}
