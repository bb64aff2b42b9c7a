#![warn(missing_docs)]
//! # gut-log-api
//!
//! ## Purpose
//! Defines the wire contract between the client and the classification
//! backend.
//!
//! ## Responsibilities
//! - Validate and hold the injected backend base URL ([`ApiConfig`]).
//! - Name every endpoint path the client consumes.
//! - Decode response bodies into core model values, tolerating the optional
//!   fields the backend may omit.
//!
//! ## Data flow
//! Raw response bytes -> `parse_*` -> core model value consumed by a feed
//! synchronizer or the upload client.
//!
//! ## Ownership and lifetimes
//! Parsed values are owned so they outlive the transient network buffer.
//!
//! ## Error model
//! Invalid JSON, missing mandatory fields, and contract violations return
//! [`ApiError`].

use std::time::Duration;

use chrono::NaiveDateTime;
use gut_log_core::{CalendarDensity, ClassificationResult, LogEntry, Tip, WeeklyStats};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Weekly log window endpoint.
pub const WEEKLY_PATH: &str = "/stats/weekly";
/// Daily tip endpoint.
pub const TIPS_PATH: &str = "/tips";
/// Calendar density endpoint.
pub const CALENDAR_PATH: &str = "/stats/calendar";
/// Classification upload endpoint.
pub const PREDICT_PATH: &str = "/predict";
/// Full log archive endpoint.
pub const HISTORY_PATH: &str = "/history";
/// Health probe endpoint.
pub const HEALTH_PATH: &str = "/";

/// Multipart field name the backend reads the image from.
pub const PREDICT_FILE_FIELD: &str = "file";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend location and transport limits, injected into every client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: Url,
    timeout: Duration,
}

impl ApiConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidBaseUrl`] when the URL does not parse, is
    /// not http(s), has no host, or carries a query/fragment. Returns
    /// [`ApiError::InvalidTimeout`] for a zero timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = validate_base_url(base_url)?;
        if timeout.is_zero() {
            return Err(ApiError::InvalidTimeout);
        }

        Ok(Self { base_url, timeout })
    }

    /// Configured base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves an endpoint path against the base URL, keeping any base path
    /// prefix (`http://host/api` + `/tips` -> `http://host/api/tips`).
    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            self.base_url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        url
    }
}

/// Validates the backend base URL.
///
/// # Errors
/// Returns [`ApiError::InvalidBaseUrl`] describing the first violated rule.
pub fn validate_base_url(raw: &str) -> Result<Url, ApiError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|error| ApiError::InvalidBaseUrl(format!("invalid base url: {error}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::InvalidBaseUrl(format!(
            "unsupported scheme {:?}, expected http or https",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none() {
        return Err(ApiError::InvalidBaseUrl("base url has no host".to_string()));
    }

    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(ApiError::InvalidBaseUrl(
            "base url must not carry a query or fragment".to_string(),
        ));
    }

    Ok(parsed)
}

/// Body of `GET /stats/weekly`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyResponse {
    /// Entries in server order; absent means empty.
    #[serde(default)]
    pub week_logs: Vec<LogEntry>,
}

/// Body of `GET /tips`. Both fields may be missing on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipResponse {
    /// Status label.
    #[serde(default)]
    pub status: Option<String>,
    /// Advice text.
    #[serde(default)]
    pub tip: Option<String>,
}

/// Body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Predicted label.
    pub prediction: String,
    /// Confidence as reported; range is not checked.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Location of the stored upload.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One stored classification from `GET /history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedLog {
    /// Server row id.
    pub id: i64,
    /// Local timestamp of the classification.
    pub timestamp: NaiveDateTime,
    /// Predicted label.
    pub label: String,
    /// Confidence as stored.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Server-side image path.
    #[serde(default)]
    pub image_path: Option<String>,
}

/// Body of the health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Human-readable service status.
    pub status: String,
}

/// Decodes the weekly window.
///
/// # Errors
/// Returns [`ApiError::Decode`] for invalid JSON or entry shapes.
pub fn parse_weekly(raw: &[u8]) -> Result<WeeklyStats, ApiError> {
    let parsed: WeeklyResponse = serde_json::from_slice(raw)?;
    Ok(WeeklyStats::new(parsed.week_logs))
}

/// Decodes the daily tip.
///
/// # Errors
/// Returns [`ApiError::MissingField`] when `status` or `tip` is absent, so the
/// caller keeps its previous tip.
pub fn parse_tip(raw: &[u8]) -> Result<Tip, ApiError> {
    let parsed: TipResponse = serde_json::from_slice(raw)?;
    let status = parsed.status.ok_or(ApiError::MissingField("status"))?;
    let tip = parsed.tip.ok_or(ApiError::MissingField("tip"))?;
    Ok(Tip { status, tip })
}

/// Decodes the calendar density map.
///
/// # Errors
/// Returns [`ApiError::Decode`] for non-ISO keys or non-integer counts.
pub fn parse_calendar(raw: &[u8]) -> Result<CalendarDensity, ApiError> {
    Ok(serde_json::from_slice(raw)?)
}

/// Decodes a classification response.
///
/// # Errors
/// Returns [`ApiError::Decode`] for invalid JSON and
/// [`ApiError::InvalidContract`] for a blank prediction label.
pub fn parse_prediction(raw: &[u8]) -> Result<ClassificationResult, ApiError> {
    let parsed: PredictResponse = serde_json::from_slice(raw)?;
    if parsed.prediction.trim().is_empty() {
        return Err(ApiError::InvalidContract(
            "prediction is empty".to_string(),
        ));
    }

    Ok(ClassificationResult {
        prediction: parsed.prediction,
        confidence: parsed.confidence,
        image_url: parsed.image_url,
    })
}

/// Decodes the full log archive, keeping server order.
///
/// # Errors
/// Returns [`ApiError::Decode`] for invalid JSON or row shapes.
pub fn parse_archive(raw: &[u8]) -> Result<Vec<ArchivedLog>, ApiError> {
    Ok(serde_json::from_slice(raw)?)
}

/// Decodes the health probe body.
///
/// # Errors
/// Returns [`ApiError::Decode`] for invalid JSON.
pub fn parse_health(raw: &[u8]) -> Result<HealthResponse, ApiError> {
    Ok(serde_json::from_slice(raw)?)
}

/// Wire contract errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Base URL violates configuration rules.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    /// Timeout must be non-zero.
    #[error("request timeout must be greater than zero")]
    InvalidTimeout,
    /// JSON decode failure.
    #[error("response decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// A field the client needs was absent.
    #[error("response is missing field `{0}`")]
    MissingField(&'static str),
    /// Parsed body violates contract invariants.
    #[error("response contract violation: {0}")]
    InvalidContract(String),
}
