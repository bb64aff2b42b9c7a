//! Integration tests for focus-driven feed refreshes.

mod common;

use std::sync::Arc;

use gut_log_app::Dashboard;
use gut_log_core::FeedKind;
use gut_log_sync::{FeedPhase, FeedSource, FetchError, HttpFeedSource, RefreshOutcome};
use gut_log_ui::ScreenId;
use httpmock::prelude::*;
use serde_json::json;

fn dashboard_for(server: &MockServer) -> Dashboard {
    let source: Arc<dyn FeedSource> = Arc::new(
        HttpFeedSource::new(common::config(&server.base_url())).expect("source should build"),
    );
    Dashboard::new(source)
}

fn weekly_body() -> serde_json::Value {
    json!({"week_logs": [
        {"date": "May 7, 2024", "label": "Healthy", "time": "08:10", "has_log": true},
        {"date": "May 6, 2024", "label": "No log", "has_log": false},
        {"date": "May 5, 2024", "label": "Healthy", "time": "19:02", "has_log": true},
        {"date": "May 4, 2024", "label": "Constipation", "time": "07:55", "has_log": true},
        {"date": "May 3, 2024", "label": "No log", "has_log": false},
        {"date": "May 2, 2024", "label": "No log", "has_log": false},
        {"date": "May 1, 2024", "label": "Diarrhea", "time": "12:30", "has_log": true}
    ]})
}

#[tokio::test]
async fn dashboard_focus_tests_home_fetches_weekly_and_tip_only() {
    let server = MockServer::start_async().await;
    let weekly = server
        .mock_async(|when, then| {
            when.method(GET).path("/stats/weekly");
            then.status(200).json_body(weekly_body());
        })
        .await;
    let tips = server
        .mock_async(|when, then| {
            when.method(GET).path("/tips");
            then.status(200)
                .json_body(json!({"status": "Healthy", "tip": "Drink water."}));
        })
        .await;
    let calendar = server
        .mock_async(|when, then| {
            when.method(GET).path("/stats/calendar");
            then.status(200).json_body(json!({}));
        })
        .await;

    let dashboard = dashboard_for(&server);
    let report = dashboard.on_focus(ScreenId::Home).await;

    assert_eq!(
        report.outcomes,
        vec![
            (FeedKind::WeeklyStats, RefreshOutcome::Updated),
            (FeedKind::Tip, RefreshOutcome::Updated),
        ]
    );
    weekly.assert_hits_async(1).await;
    tips.assert_hits_async(1).await;
    calendar.assert_hits_async(0).await;

    let view = dashboard.home();
    assert_eq!(view.summary, "You've experienced 4 bowel movements this week!");
    assert_eq!(view.tip.status, "Healthy");
    assert_eq!(view.tip.tip, "Drink water.");
}

#[tokio::test]
async fn dashboard_focus_tests_failed_tip_keeps_placeholder() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/stats/weekly");
            then.status(200).json_body(weekly_body());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/tips");
            then.status(503);
        })
        .await;

    let dashboard = dashboard_for(&server);
    let report = dashboard.on_focus(ScreenId::Home).await;

    assert_eq!(report.degraded(), vec![FeedKind::Tip]);
    assert!(dashboard.home().tip.is_placeholder());
    assert_eq!(dashboard.weekly().snapshot().real_count(), 4);
    assert_eq!(dashboard.tip().phase(), FeedPhase::StaleWithError);
    assert_eq!(
        dashboard.tip().last_error(),
        Some(FetchError::Status(503))
    );
}

#[tokio::test]
async fn dashboard_focus_tests_history_builds_rows_and_dots() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/stats/weekly");
            then.status(200).json_body(weekly_body());
        })
        .await;
    let tips = server
        .mock_async(|when, then| {
            when.method(GET).path("/tips");
            then.status(200).json_body(json!({"status": "Healthy", "tip": "x"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/stats/calendar");
            then.status(200)
                .json_body(json!({"2024-05-01": 5, "2024-05-02": 0, "2024-05-03": 2}));
        })
        .await;

    let dashboard = dashboard_for(&server);
    let report = dashboard.on_focus(ScreenId::History).await;
    assert!(report.degraded().is_empty());
    tips.assert_hits_async(0).await;

    let view = dashboard.history();
    assert_eq!(view.rows.len(), 7);
    assert_eq!(view.rows[0].date, "May 7, 2024");
    assert_eq!(view.rows[0].time.as_deref(), Some("08:10"));
    assert_eq!(view.rows[1].label, "No log");
    assert_eq!(view.rows[1].time, None);

    let counts: Vec<usize> = view.marking.values().map(Vec::len).collect();
    assert_eq!(counts, vec![3, 2]);
}

#[tokio::test]
async fn dashboard_focus_tests_capture_screen_fetches_nothing() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).json_body(json!({}));
        })
        .await;

    let dashboard = dashboard_for(&server);
    let report = dashboard.on_focus(ScreenId::Capture).await;

    assert!(report.outcomes.is_empty());
    any.assert_hits_async(0).await;
    assert!(
        dashboard
            .statuses()
            .iter()
            .all(|status| status.phase == FeedPhase::Stale)
    );
}
