//! Integration tests for the per-feed in-flight guard.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gut_log_sync::{
    FeedPhase, FeedSource, FeedSynchronizer, FetchError, RefreshOutcome, TipFeed,
};
use tokio::sync::Notify;

/// Source whose responses wait until the test releases them.
#[derive(Default)]
struct GatedSource {
    gate: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl FeedSource for GatedSource {
    async fn get(&self, _path: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(br#"{"status":"Healthy","tip":"Good job yesterday!"}"#.to_vec())
    }
}

#[tokio::test]
async fn in_flight_guard_tests_second_refresh_is_ignored() {
    let source = Arc::new(GatedSource::default());
    let sync = FeedSynchronizer::<TipFeed>::new(source.clone());

    let (first, second) = tokio::join!(sync.refresh(), async {
        tokio::task::yield_now().await;
        let second = sync.refresh().await;
        source.gate.notify_one();
        second
    });

    assert_eq!(first, RefreshOutcome::Updated);
    assert_eq!(second, RefreshOutcome::AlreadyInFlight);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(sync.phase(), FeedPhase::Fresh);
}

#[tokio::test]
async fn in_flight_guard_tests_dropped_refresh_does_not_wedge_feed() {
    let source = Arc::new(GatedSource::default());
    let sync = FeedSynchronizer::<TipFeed>::new(source.clone());

    let abandoned = tokio::time::timeout(Duration::from_millis(20), sync.refresh()).await;
    assert!(abandoned.is_err());
    assert_eq!(sync.phase(), FeedPhase::Stale);

    source.gate.notify_one();
    assert_eq!(sync.refresh().await, RefreshOutcome::Updated);
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn in_flight_guard_tests_late_response_is_still_applied() {
    let source = Arc::new(GatedSource::default());
    let sync = FeedSynchronizer::<TipFeed>::new(source.clone());

    // The screen loses focus while the fetch is pending; nothing cancels it.
    let (outcome, ()) = tokio::join!(sync.refresh(), async {
        tokio::task::yield_now().await;
        assert_eq!(sync.phase(), FeedPhase::Fetching);
        source.gate.notify_one();
    });

    assert_eq!(outcome, RefreshOutcome::Updated);
    assert_eq!(sync.snapshot().status, "Healthy");
}
