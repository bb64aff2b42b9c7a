#![warn(missing_docs)]
//! # gut-log-ui
//!
//! ## Purpose
//! Defines the render-ready projections the screens draw from.
//!
//! ## Responsibilities
//! - Name the screens as a closed enum mapped to their tab icon, their feeds,
//!   and whether they offer the capture action.
//! - Turn calendar density into bounded dot markings.
//! - Turn the weekly window into ordered history rows.
//! - Format classification results and one-shot user notices.
//!
//! ## Data flow
//! Synchronizer snapshots -> pure projections here -> layout.
//!
//! ## Error model
//! Everything here is a total function over already-validated values.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use gut_log_core::{
    CalendarDensity, ClassificationResult, FeedKind, Tip, WeeklyStats, format_clock_time,
    format_display_date,
};

/// Upper bound on markers drawn for one day.
pub const MAX_MARKERS_PER_DAY: usize = 3;

/// Marker color shared by every dot.
pub const MARKER_COLOR: &str = "#8B4513";

/// Greeting shown at the top of the home screen.
pub const HOME_GREETING: &str = "Hey there!";

/// Screen identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenId {
    /// Weekly summary and tip.
    Home,
    /// Camera capture and classification.
    Capture,
    /// Log list and calendar.
    History,
}

/// Tab bar glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabIcon {
    /// Outline stool glyph.
    Stool,
    /// Camera glyph.
    Camera,
    /// Calendar glyph.
    Calendar,
}

impl ScreenId {
    /// Tab order.
    pub const ALL: [ScreenId; 3] = [ScreenId::Home, ScreenId::Capture, ScreenId::History];

    /// Tab glyph.
    pub fn icon(self) -> TabIcon {
        match self {
            ScreenId::Home => TabIcon::Stool,
            ScreenId::Capture => TabIcon::Camera,
            ScreenId::History => TabIcon::Calendar,
        }
    }

    /// Feeds refreshed when this screen gains focus.
    pub fn feeds(self) -> &'static [FeedKind] {
        match self {
            ScreenId::Home => &[FeedKind::WeeklyStats, FeedKind::Tip],
            ScreenId::Capture => &[],
            ScreenId::History => &[FeedKind::WeeklyStats, FeedKind::CalendarDensity],
        }
    }

    /// Whether the screen hosts the capture action.
    pub fn offers_capture(self) -> bool {
        matches!(self, ScreenId::Capture)
    }
}

/// One dot drawn under a calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerToken {
    /// Stable key within the day (`dot-1`, `dot-2`, ...).
    pub key: String,
    /// Fill color.
    pub color: &'static str,
}

/// Calendar date to ordered markers. Days without markers are absent.
pub type DotMarking = BTreeMap<NaiveDate, Vec<MarkerToken>>;

/// Converts occurrence counts into at most [`MAX_MARKERS_PER_DAY`] dots per day.
///
/// Days with a zero count get no entry.
pub fn to_dot_marking(density: &CalendarDensity) -> DotMarking {
    density
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(date, count)| {
            let shown = (count as usize).min(MAX_MARKERS_PER_DAY);
            let markers = (1..=shown)
                .map(|index| MarkerToken {
                    key: format!("dot-{index}"),
                    color: MARKER_COLOR,
                })
                .collect();
            (date, markers)
        })
        .collect()
}

/// One row of the history list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    /// Display date (`May 1, 2024`).
    pub date: String,
    /// Classification label or `No log`.
    pub label: String,
    /// `HH:MM`, present only for days with a record.
    pub time: Option<String>,
}

/// Projects the weekly window into rows, keeping input order.
pub fn to_display_list(stats: &WeeklyStats) -> Vec<HistoryRow> {
    stats
        .entries()
        .iter()
        .map(|entry| HistoryRow {
            date: format_display_date(entry.date),
            label: entry.label.clone(),
            time: entry.logged_time().map(format_clock_time),
        })
        .collect()
}

/// Formats a confidence as a one-decimal percentage.
///
/// Values are shown as received, so `1.7` renders as `170.0%`. A missing value
/// renders as `unknown`.
pub fn format_confidence(confidence: Option<f64>) -> String {
    match confidence {
        Some(value) if value.is_finite() => format!("{:.1}%", value * 100.0),
        Some(_) | None => "unknown".to_string(),
    }
}

/// Home status line for the weekly record count.
pub fn weekly_summary(real_count: usize) -> String {
    let noun = if real_count == 1 {
        "bowel movement"
    } else {
        "bowel movements"
    };
    format!("You've experienced {real_count} {noun} this week!")
}

/// Everything the home screen renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeView {
    /// Greeting line.
    pub greeting: &'static str,
    /// Weekly status line.
    pub summary: String,
    /// Current tip.
    pub tip: Tip,
}

/// Builds the home projection.
pub fn home_view(stats: &WeeklyStats, tip: &Tip) -> HomeView {
    HomeView {
        greeting: HOME_GREETING,
        summary: weekly_summary(stats.real_count()),
        tip: tip.clone(),
    }
}

/// Everything the history screen renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryView {
    /// Weekly rows in source order.
    pub rows: Vec<HistoryRow>,
    /// Calendar dots.
    pub marking: DotMarking,
}

/// Builds the history projection.
pub fn history_view(stats: &WeeklyStats, density: &CalendarDensity) -> HistoryView {
    HistoryView {
        rows: to_display_list(stats),
        marking: to_dot_marking(density),
    }
}

/// One-shot message shown after a capture attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserNotice {
    /// Camera access missing; the screen shows a re-request button.
    PermissionRequired {
        /// `true` when the user already refused once.
        denied: bool,
    },
    /// Camera could not take the photo.
    CaptureFailed,
    /// Classification upload failed.
    UploadFailed,
    /// Classification succeeded.
    Classified {
        /// Predicted label.
        prediction: String,
        /// Formatted confidence.
        confidence: String,
    },
}

impl UserNotice {
    /// Notice for a successful classification.
    pub fn classified(result: &ClassificationResult) -> Self {
        UserNotice::Classified {
            prediction: result.prediction.clone(),
            confidence: format_confidence(result.confidence),
        }
    }

    /// Short heading.
    pub fn title(&self) -> &'static str {
        match self {
            UserNotice::PermissionRequired { .. } => "Camera access needed",
            UserNotice::CaptureFailed | UserNotice::UploadFailed => "Error",
            UserNotice::Classified { .. } => "Result",
        }
    }

    /// Body text.
    pub fn message(&self) -> String {
        match self {
            UserNotice::PermissionRequired { denied: false } => {
                "Allow camera access to photograph a log.".to_string()
            }
            UserNotice::PermissionRequired { denied: true } => {
                "Camera access was denied. Tap to ask again.".to_string()
            }
            UserNotice::CaptureFailed => "Could not take the photo.".to_string(),
            UserNotice::UploadFailed => "Upload failed.".to_string(),
            UserNotice::Classified {
                prediction,
                confidence,
            } => format!("{prediction} ({confidence} confidence)"),
        }
    }

    /// Whether the notice carries a user-triggered retry button.
    pub fn offers_permission_retry(&self) -> bool {
        matches!(self, UserNotice::PermissionRequired { .. })
    }
}
