#![warn(missing_docs)]
//! # gut-log-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `gut-log` workspace.
//!
//! ## Responsibilities
//! - Represent the weekly log window, the daily tip, and calendar density.
//! - Represent captured still images and classification outcomes.
//! - Parse and format the calendar-date and clock-time shapes used by the
//!   backend wire format.
//!
//! ## Data flow
//! Feed synchronizers decode server bodies into [`WeeklyStats`], [`Tip`], and
//! [`CalendarDensity`]. The capture pipeline emits an [`ImageHandle`] that the
//! upload client turns into a [`ClassificationResult`].
//!
//! ## Ownership and lifetimes
//! Every value owns its data (`String`, `Vec<u8>`, `BTreeMap`) so snapshots can
//! be replaced wholesale without borrowing from transient network buffers.
//!
//! ## Error model
//! Construction and parsing failures return [`CoreError`] variants.
//!
//! ## Example
//! ```rust
//! use chrono::NaiveDate;
//! use gut_log_core::{LogEntry, WeeklyStats};
//!
//! let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
//! let stats = WeeklyStats::new(vec![
//!     LogEntry::logged(day, "Healthy", None),
//!     LogEntry::missing(day.succ_opt().unwrap()),
//! ]);
//! assert_eq!(stats.real_count(), 1);
//! ```

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of entries the weekly window is expected to carry.
pub const EXPECTED_WEEK_LEN: usize = 7;

/// Display format used by the weekly endpoint (`May 1, 2024`).
pub const DISPLAY_DATE_FORMAT: &str = "%b %-d, %Y";

/// Clock-time format used by the weekly endpoint (`08:15`).
pub const CLOCK_TIME_FORMAT: &str = "%H:%M";

/// Label the backend uses for days without a record.
pub const NO_LOG_LABEL: &str = "No log";

/// Identity of one independently fetched server-derived view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeedKind {
    /// Trailing seven-day log window.
    WeeklyStats,
    /// Daily advice plus status label.
    Tip,
    /// Per-day occurrence counts.
    CalendarDensity,
}

impl FeedKind {
    /// Every feed, in a stable order.
    pub const ALL: [FeedKind; 3] = [
        FeedKind::WeeklyStats,
        FeedKind::Tip,
        FeedKind::CalendarDensity,
    ];

    /// Short identifier used in logs and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            FeedKind::WeeklyStats => "weekly_stats",
            FeedKind::Tip => "tip",
            FeedKind::CalendarDensity => "calendar_density",
        }
    }
}

/// One calendar day's status inside the weekly window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Calendar day this entry describes.
    #[serde(with = "wire_date")]
    pub date: NaiveDate,
    /// Classification label, or [`NO_LOG_LABEL`] when nothing was recorded.
    pub label: String,
    /// Whether a record exists for this day.
    #[serde(default)]
    pub has_log: bool,
    /// Local clock time of the record. Only meaningful when `has_log` is set.
    #[serde(default, with = "wire_time", skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
}

impl LogEntry {
    /// Creates an entry for a day with a record.
    pub fn logged(date: NaiveDate, label: impl Into<String>, time: Option<NaiveTime>) -> Self {
        Self {
            date,
            label: label.into(),
            has_log: true,
            time,
        }
    }

    /// Creates an entry for a day without a record.
    pub fn missing(date: NaiveDate) -> Self {
        Self {
            date,
            label: NO_LOG_LABEL.to_string(),
            has_log: false,
            time: None,
        }
    }

    /// Returns the record time, masked to `None` for days without a record.
    pub fn logged_time(&self) -> Option<NaiveTime> {
        if self.has_log { self.time } else { None }
    }
}

/// Latest snapshot of the weekly log window.
///
/// Entries keep the order the server sent them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyStats {
    entries: Vec<LogEntry>,
}

impl WeeklyStats {
    /// Wraps a server-ordered entry list.
    pub fn new(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    /// Returns the entries in source order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries with a record.
    pub fn real_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.has_log).count()
    }

    /// Number of entries in the window.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the window holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` when the window has the expected seven entries.
    pub fn is_full_week(&self) -> bool {
        self.entries.len() == EXPECTED_WEEK_LEN
    }
}

/// Server-chosen advice plus a short status label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    /// Short status label (`Healthy`, `No data`, ...).
    pub status: String,
    /// Advice text.
    pub tip: String,
}

impl Tip {
    /// Value shown before the first successful fetch completes.
    pub fn placeholder() -> Self {
        Self {
            status: "Loading".to_string(),
            tip: "Fetching today's tip...".to_string(),
        }
    }

    /// Returns `true` while the placeholder is still in place.
    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder()
    }
}

impl Default for Tip {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Per-day occurrence counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarDensity {
    counts: BTreeMap<NaiveDate, u32>,
}

impl CalendarDensity {
    /// Wraps a date to count mapping.
    pub fn new(counts: BTreeMap<NaiveDate, u32>) -> Self {
        Self { counts }
    }

    /// Returns the count recorded for `date`, if any.
    pub fn count(&self, date: NaiveDate) -> Option<u32> {
        self.counts.get(&date).copied()
    }

    /// Iterates dates in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u32)> + '_ {
        self.counts.iter().map(|(date, count)| (*date, *count))
    }

    /// Number of dates present in the mapping.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns `true` when no date is present.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(NaiveDate, u32)> for CalendarDensity {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, u32)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

/// Outcome of one successful classification upload.
///
/// Never cached or persisted; it lives only while the result is displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Predicted label.
    pub prediction: String,
    /// Model confidence, nominally in `[0, 1]`. Not validated.
    pub confidence: Option<f64>,
    /// Server-relative location of the stored upload, when reported.
    pub image_url: Option<String>,
}

/// One captured still image, already compressed for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageHandle {
    bytes: Vec<u8>,
    content_type: String,
    width: u32,
    height: u32,
}

impl ImageHandle {
    /// Creates a validated image handle.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyImage`] for an empty buffer and
    /// [`CoreError::InvalidImageGeometry`] when either dimension is zero.
    pub fn new(
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Result<Self, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::EmptyImage);
        }
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidImageGeometry { width, height });
        }

        Ok(Self {
            bytes,
            content_type: content_type.into(),
            width,
            height,
        })
    }

    /// Encoded image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type of the encoded bytes.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Pixel width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`; construction rejects empty buffers.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Image bytes stay out of debug output.
impl std::fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHandle")
            .field("content_type", &self.content_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Parses a calendar date in ISO (`2024-05-01`) or display (`May 1, 2024`) form.
///
/// # Errors
/// Returns [`CoreError::InvalidDate`] when no accepted form matches.
pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate, CoreError> {
    let raw = raw.trim();
    ["%Y-%m-%d", "%b %d, %Y", "%B %d, %Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .ok_or_else(|| CoreError::InvalidDate(raw.to_string()))
}

/// Parses a clock time in `HH:MM` or `HH:MM:SS` form.
///
/// # Errors
/// Returns [`CoreError::InvalidTime`] when no accepted form matches.
pub fn parse_clock_time(raw: &str) -> Result<NaiveTime, CoreError> {
    let raw = raw.trim();
    ["%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| CoreError::InvalidTime(raw.to_string()))
}

/// Formats a date the way the weekly endpoint displays it.
pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// Formats a clock time as `HH:MM`.
pub fn format_clock_time(time: NaiveTime) -> String {
    time.format(CLOCK_TIME_FORMAT).to_string()
}

/// Error type for core model validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Image buffer is empty.
    #[error("image buffer is empty")]
    EmptyImage,
    /// Image dimensions must be non-zero.
    #[error("invalid image geometry: {width}x{height}")]
    InvalidImageGeometry {
        /// Reported width.
        width: u32,
        /// Reported height.
        height: u32,
    },
    /// Calendar date could not be parsed.
    #[error("invalid calendar date: {0:?}")]
    InvalidDate(String),
    /// Clock time could not be parsed.
    #[error("invalid clock time: {0:?}")]
    InvalidTime(String),
}

mod wire_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_display_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_calendar_date(&raw).map_err(de::Error::custom)
    }
}

mod wire_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.serialize_some(&super::format_clock_time(*time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|raw| super::parse_clock_time(&raw).map_err(de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for wire shapes and derived counts.

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).expect("valid date")
    }

    #[test]
    fn parses_display_and_iso_dates() {
        assert_eq!(parse_calendar_date("May 1, 2024").unwrap(), day(1));
        assert_eq!(parse_calendar_date("2024-05-01").unwrap(), day(1));
        assert_eq!(parse_calendar_date("May 12, 2024").unwrap(), day(12));
        assert!(parse_calendar_date("yesterday").is_err());
    }

    #[test]
    fn log_entry_decodes_missing_time() {
        let entry: LogEntry = serde_json::from_str(
            r#"{"date":"May 2, 2024","label":"No log","has_log":false}"#,
        )
        .expect("entry should decode");
        assert_eq!(entry, LogEntry::missing(day(2)));
    }

    #[test]
    fn logged_time_is_masked_without_record() {
        let mut entry = LogEntry::missing(day(3));
        entry.time = Some(NaiveTime::from_hms_opt(7, 30, 0).expect("valid time"));
        assert_eq!(entry.logged_time(), None);
    }

    #[test]
    fn image_handle_rejects_empty_buffer() {
        assert!(matches!(
            ImageHandle::new(Vec::new(), "image/jpeg", 1, 1),
            Err(CoreError::EmptyImage)
        ));
        assert!(matches!(
            ImageHandle::new(vec![1], "image/jpeg", 0, 1),
            Err(CoreError::InvalidImageGeometry { .. })
        ));
    }
}
