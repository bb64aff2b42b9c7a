//! Integration tests for calendar dot markings.

use chrono::NaiveDate;
use gut_log_core::CalendarDensity;
use gut_log_ui::{MAX_MARKERS_PER_DAY, to_dot_marking};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).expect("valid date")
}

#[test]
fn dot_marking_tests_caps_markers_and_drops_zero_days() {
    let density: CalendarDensity = [(day(1), 5), (day(2), 0)].into_iter().collect();
    let marking = to_dot_marking(&density);

    assert_eq!(marking.len(), 1);
    assert_eq!(marking[&day(1)].len(), 3);
    assert!(!marking.contains_key(&day(2)));
    assert!(!marking.contains_key(&day(3)));
}

#[test]
fn dot_marking_tests_marker_count_is_min_of_count_and_cap() {
    let density: CalendarDensity = (0..=6).map(|count| (day(count + 1), count)).collect();
    let marking = to_dot_marking(&density);

    for (date, count) in density.iter() {
        let shown = marking.get(&date).map_or(0, Vec::len);
        assert_eq!(shown, (count as usize).min(MAX_MARKERS_PER_DAY));
    }

    let keys: Vec<&str> = marking[&day(7)]
        .iter()
        .map(|marker| marker.key.as_str())
        .collect();
    assert_eq!(keys, vec!["dot-1", "dot-2", "dot-3"]);
}

#[test]
fn dot_marking_tests_is_idempotent() {
    let density: CalendarDensity = [(day(4), 2), (day(9), 11)].into_iter().collect();
    assert_eq!(to_dot_marking(&density), to_dot_marking(&density));
    assert!(to_dot_marking(&CalendarDensity::default()).is_empty());
}
