//! Integration tests for backend response decoding.

use gut_log_api::{
    ApiError, parse_archive, parse_calendar, parse_health, parse_prediction, parse_tip,
    parse_weekly,
};

#[test]
fn response_parsing_tests_weekly_without_week_logs_is_empty() {
    let stats = parse_weekly(br#"{}"#).expect("empty weekly body should parse");
    assert!(stats.is_empty());
    assert_eq!(stats.real_count(), 0);
}

#[test]
fn response_parsing_tests_weekly_accepts_display_dates() {
    let raw = br#"{"week_logs":[
        {"date":"Oct 19, 2026","label":"Healthy","time":"07:45","has_log":true},
        {"date":"Oct 18, 2026","label":"No log","has_log":false}
    ]}"#;
    let stats = parse_weekly(raw).expect("weekly body should parse");
    assert_eq!(stats.len(), 2);
    assert_eq!(stats.real_count(), 1);
    assert_eq!(
        stats.entries()[0]
            .logged_time()
            .map(|time| time.format("%H:%M").to_string()),
        Some("07:45".to_string())
    );
}

#[test]
fn response_parsing_tests_tip_without_status_is_rejected() {
    let error = parse_tip(br#"{"tip":"Drink water."}"#).expect_err("status is required");
    assert!(matches!(error, ApiError::MissingField("status")));

    let tip = parse_tip(br#"{"status":"Healthy","tip":"Good job yesterday!"}"#)
        .expect("complete tip should parse");
    assert_eq!(tip.status, "Healthy");
}

#[test]
fn response_parsing_tests_calendar_rejects_non_iso_keys() {
    assert!(parse_calendar(br#"{"May 1, 2024": 2}"#).is_err());
    let density = parse_calendar(br#"{"2024-05-01": 2}"#).expect("iso keys should parse");
    assert_eq!(density.len(), 1);
}

#[test]
fn response_parsing_tests_prediction_tolerates_missing_confidence() {
    let result = parse_prediction(br#"{"prediction":"Healthy"}"#)
        .expect("prediction without confidence should parse");
    assert_eq!(result.prediction, "Healthy");
    assert_eq!(result.confidence, None);

    let result = parse_prediction(br#"{"prediction":"Diarrhea","confidence":1.7}"#)
        .expect("out-of-range confidence is surfaced as-is");
    assert_eq!(result.confidence, Some(1.7));

    assert!(matches!(
        parse_prediction(br#"{"prediction":"  ","confidence":0.5}"#),
        Err(ApiError::InvalidContract(_))
    ));
}

#[test]
fn response_parsing_tests_archive_and_health() {
    let archive = parse_archive(
        br#"[{"id":2,"timestamp":"2024-05-02T08:15:30.123456","label":"Healthy",
              "confidence":0.91,"image_path":"uploads/20240502_081530_photo.jpg"}]"#,
    )
    .expect("archive should parse");
    assert_eq!(archive[0].id, 2);
    assert_eq!(archive[0].label, "Healthy");

    let health = parse_health(br#"{"status":"online"}"#).expect("health should parse");
    assert_eq!(health.status, "online");
}
