#![warn(missing_docs)]
//! # gut-log-app
//!
//! ## Purpose
//! Orchestrates permission, capture, upload, feed synchronization, and screen
//! projections for `gut-log`.
//!
//! ## Responsibilities
//! - Run the capture flow behind the permission gate and the capture lock.
//! - Refresh the feeds each screen depends on when that screen gains focus.
//! - Build runtime configuration and install the log subscriber.
//!
//! ## Data flow
//! Screen focus -> [`Dashboard::on_focus`] -> feed synchronizers -> screen views.
//! Capture action -> [`CaptureController::capture`] -> permission -> camera ->
//! upload -> [`UserNotice`].
//!
//! ## Ownership and lifetimes
//! Feeds and the capture controller are owned by the shell for the process
//! lifetime; views are owned snapshots.
//!
//! ## Error model
//! Capture failures are wrapped in [`CaptureFlowError`] and each maps to at
//! most one [`UserNotice`]; their details only reach the logs. Startup and
//! feed command failures are wrapped in [`AppError`].

use std::sync::Arc;
use std::time::Duration;

use gut_log_api::{ApiConfig, ApiError};
use gut_log_capture::{CameraBackend, CaptureError, CaptureLock, CaptureQuality, CaptureState};
use gut_log_core::{ClassificationResult, FeedKind};
use gut_log_permission::{PermissionError, PermissionGate, PermissionState};
use gut_log_sync::{
    CalendarFeed, FeedSource, FeedStatus, FeedSynchronizer, FetchError, RefreshOutcome, TipFeed,
    WeeklyFeed,
};
use gut_log_ui::{HistoryView, HomeView, ScreenId, UserNotice, history_view, home_view};
use gut_log_upload::{UploadClient, UploadError};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("GUT_LOG_VERSION");

/// Default backend origin.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default log level applied to `gut_log` targets when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Backend endpoint settings.
    pub api: ApiConfig,
    /// Compression factor for captured stills.
    pub capture_quality: CaptureQuality,
}

impl AppConfig {
    /// Validates raw settings.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for a bad base URL or zero timeout and
    /// [`AppError::Capture`] for a quality outside `(0, 1]`.
    pub fn new(base_url: &str, timeout_secs: u64, capture_quality: f32) -> Result<Self, AppError> {
        let api = ApiConfig::new(base_url, Duration::from_secs(timeout_secs))?;
        let capture_quality = CaptureQuality::new(capture_quality).map_err(AppError::Capture)?;
        Ok(Self {
            api,
            capture_quality,
        })
    }
}

/// Builds the log filter from `RUST_LOG`, falling back to `gut_log={level}`.
///
/// # Errors
/// Returns [`AppError::Logging`] when `level` is not a valid directive.
pub fn log_filter(level: &str) -> Result<EnvFilter, AppError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(format!("warn,gut_log={level}"))
        .map_err(|error| AppError::Logging(error.to_string()))
}

/// Installs the global stderr subscriber.
///
/// # Errors
/// Returns [`AppError::Logging`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_logging(level: &str) -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level)?)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|error| AppError::Logging(error.to_string()))
}

/// Why a capture attempt ended without a classification.
#[derive(Debug, Error)]
pub enum CaptureFlowError {
    /// Another capture is still running.
    #[error("a capture is already in progress")]
    Busy,
    /// Camera access is missing.
    #[error(transparent)]
    Permission(#[from] PermissionError),
    /// The camera failed to produce a still.
    #[error(transparent)]
    Capture(#[from] CaptureError),
    /// The classification upload failed.
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl CaptureFlowError {
    /// Notice shown for this failure. A rejected re-entry shows nothing.
    pub fn notice(&self) -> Option<UserNotice> {
        match self {
            CaptureFlowError::Busy => None,
            CaptureFlowError::Permission(PermissionError::Denied) => {
                Some(UserNotice::PermissionRequired { denied: true })
            }
            CaptureFlowError::Permission(PermissionError::NotRequested) => {
                Some(UserNotice::PermissionRequired { denied: false })
            }
            CaptureFlowError::Capture(_) => Some(UserNotice::CaptureFailed),
            CaptureFlowError::Upload(_) => Some(UserNotice::UploadFailed),
        }
    }
}

/// Maps a finished capture attempt to the single notice it produces.
pub fn capture_notice(
    outcome: &Result<ClassificationResult, CaptureFlowError>,
) -> Option<UserNotice> {
    match outcome {
        Ok(result) => Some(UserNotice::classified(result)),
        Err(error) => error.notice(),
    }
}

/// What the shell shows for a finished capture attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSummary {
    /// The single notice to display, if any.
    pub notice: Option<UserNotice>,
    /// Whether a classification was received.
    pub succeeded: bool,
}

/// Reduces a capture attempt to one notice and a success flag.
///
/// Failure details stay in the logs; the notice is the only user-facing text.
pub fn summarize_capture(
    outcome: &Result<ClassificationResult, CaptureFlowError>,
) -> CaptureSummary {
    CaptureSummary {
        notice: capture_notice(outcome),
        succeeded: outcome.is_ok(),
    }
}

/// Drives one capture-and-classify action at a time.
pub struct CaptureController {
    gate: PermissionGate,
    camera: Arc<dyn CameraBackend>,
    uploader: UploadClient,
    quality: CaptureQuality,
    lock: CaptureLock,
}

impl CaptureController {
    /// Wires the controller from its collaborators.
    pub fn new(
        gate: PermissionGate,
        camera: Arc<dyn CameraBackend>,
        uploader: UploadClient,
        quality: CaptureQuality,
    ) -> Self {
        Self {
            gate,
            camera,
            uploader,
            quality,
            lock: CaptureLock::new(),
        }
    }

    /// Current capture state.
    pub fn state(&self) -> CaptureState {
        self.lock.state()
    }

    /// User-triggered permission prompt.
    pub async fn request_permission(&self) -> PermissionState {
        self.gate.request_permission().await
    }

    /// Shows the first platform prompt when access was never requested, then
    /// runs one [`CaptureController::capture`].
    ///
    /// A refused prompt ends the attempt with
    /// [`PermissionError::Denied`]. Nothing is asked twice.
    ///
    /// # Errors
    /// Same as [`CaptureController::capture`].
    pub async fn capture_after_prompt(&self) -> Result<ClassificationResult, CaptureFlowError> {
        if self.gate.query_permission().await == PermissionState::Unknown {
            self.gate.request_permission().await;
        }
        self.capture().await
    }

    /// Captures one still and uploads it for classification.
    ///
    /// The state returns to idle on every exit path.
    ///
    /// # Errors
    /// Returns [`CaptureFlowError::Busy`] while another capture runs, and the
    /// permission, camera, or upload failure otherwise. Nothing is uploaded
    /// when the camera fails.
    pub async fn capture(&self) -> Result<ClassificationResult, CaptureFlowError> {
        let Some(_session) = self.lock.try_begin() else {
            return Err(CaptureFlowError::Busy);
        };

        self.gate.ensure_granted().await?;

        let image = self
            .camera
            .capture_still(self.quality)
            .await
            .inspect_err(|error| warn!(target: "gut_log::capture", %error, "capture failed"))?;
        info!(
            target: "gut_log::capture",
            bytes = image.len(),
            width = image.width(),
            height = image.height(),
            "still captured"
        );

        Ok(self.uploader.classify(&image).await?)
    }
}

impl std::fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureController")
            .field("gate", &self.gate)
            .field("uploader", &self.uploader)
            .field("quality", &self.quality)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Per-feed results of one focus event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusReport {
    /// Screen that gained focus.
    pub screen: ScreenId,
    /// Outcome for every feed the screen depends on, in declaration order.
    pub outcomes: Vec<(FeedKind, RefreshOutcome)>,
}

impl FocusReport {
    /// Feeds whose refresh failed.
    pub fn degraded(&self) -> Vec<FeedKind> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, RefreshOutcome::Degraded(_)))
            .map(|(kind, _)| *kind)
            .collect()
    }
}

/// The three remote feeds shared by all screens.
#[derive(Debug)]
pub struct Dashboard {
    weekly: FeedSynchronizer<WeeklyFeed>,
    tip: FeedSynchronizer<TipFeed>,
    calendar: FeedSynchronizer<CalendarFeed>,
}

impl Dashboard {
    /// Creates stale feeds over one source.
    pub fn new(source: Arc<dyn FeedSource>) -> Self {
        Self {
            weekly: FeedSynchronizer::new(Arc::clone(&source)),
            tip: FeedSynchronizer::new(Arc::clone(&source)),
            calendar: FeedSynchronizer::new(source),
        }
    }

    /// Refreshes every feed `screen` depends on, concurrently.
    ///
    /// One feed failing never blocks or clears another.
    pub async fn on_focus(&self, screen: ScreenId) -> FocusReport {
        let wanted = screen.feeds();
        let (weekly, tip, calendar) = tokio::join!(
            self.refresh_if(wanted, FeedKind::WeeklyStats),
            self.refresh_if(wanted, FeedKind::Tip),
            self.refresh_if(wanted, FeedKind::CalendarDensity),
        );
        let mut by_kind = [weekly, tip, calendar];

        let outcomes = wanted
            .iter()
            .filter_map(|kind| {
                let slot = FeedKind::ALL.iter().position(|candidate| candidate == kind)?;
                by_kind[slot].take().map(|outcome| (*kind, outcome))
            })
            .collect();

        FocusReport { screen, outcomes }
    }

    /// Refreshes one feed.
    pub async fn refresh(&self, kind: FeedKind) -> RefreshOutcome {
        match kind {
            FeedKind::WeeklyStats => self.weekly.refresh().await,
            FeedKind::Tip => self.tip.refresh().await,
            FeedKind::CalendarDensity => self.calendar.refresh().await,
        }
    }

    async fn refresh_if(&self, wanted: &[FeedKind], kind: FeedKind) -> Option<RefreshOutcome> {
        if wanted.contains(&kind) {
            Some(self.refresh(kind).await)
        } else {
            None
        }
    }

    /// Home screen projection from the latest feeds.
    pub fn home(&self) -> HomeView {
        home_view(&self.weekly.snapshot(), &self.tip.snapshot())
    }

    /// History screen projection from the latest feeds.
    pub fn history(&self) -> HistoryView {
        history_view(&self.weekly.snapshot(), &self.calendar.snapshot())
    }

    /// Diagnostic status for every feed.
    pub fn statuses(&self) -> [FeedStatus; 3] {
        [
            self.weekly.status(),
            self.tip.status(),
            self.calendar.status(),
        ]
    }

    /// Weekly stats synchronizer.
    pub fn weekly(&self) -> &FeedSynchronizer<WeeklyFeed> {
        &self.weekly
    }

    /// Tip synchronizer.
    pub fn tip(&self) -> &FeedSynchronizer<TipFeed> {
        &self.tip
    }

    /// Calendar density synchronizer.
    pub fn calendar(&self) -> &FeedSynchronizer<CalendarFeed> {
        &self.calendar
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid endpoint configuration.
    #[error("config error: {0}")]
    Config(#[from] ApiError),
    /// Capture subsystem error.
    #[error("capture error: {0}")]
    Capture(CaptureError),
    /// Upload client could not be built.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),
    /// Feed request failed.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
    /// Log subscriber could not be installed.
    #[error("logging error: {0}")]
    Logging(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration and notice mapping.

    use super::*;

    #[test]
    fn config_rejects_bad_values() {
        assert!(AppConfig::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, 0.5).is_ok());
        assert!(matches!(
            AppConfig::new("ftp://host", 10, 0.5),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            AppConfig::new(DEFAULT_BASE_URL, 10, 0.0),
            Err(AppError::Capture(_))
        ));
    }

    #[test]
    fn busy_rejection_has_no_notice() {
        assert_eq!(CaptureFlowError::Busy.notice(), None);
        assert_eq!(
            CaptureFlowError::Upload(UploadError::Timeout).notice(),
            Some(UserNotice::UploadFailed)
        );
        assert_eq!(
            CaptureFlowError::Capture(CaptureError::Device("gone".to_string())).notice(),
            Some(UserNotice::CaptureFailed)
        );
    }
}
