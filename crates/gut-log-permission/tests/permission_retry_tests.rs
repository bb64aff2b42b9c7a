//! Integration tests for user-triggered permission re-requests.

use std::sync::Arc;

use gut_log_permission::{
    PermissionError, PermissionGate, PermissionState, StaticPermissionProvider,
};

#[tokio::test]
async fn permission_retry_tests_denial_never_prompts_on_its_own() {
    let provider = Arc::new(StaticPermissionProvider::new(
        PermissionState::Unknown,
        PermissionState::Denied,
    ));
    let gate = PermissionGate::new(provider.clone());

    assert_eq!(gate.request_permission().await, PermissionState::Denied);
    for _ in 0..3 {
        assert_eq!(gate.ensure_granted().await, Err(PermissionError::Denied));
    }
    assert_eq!(provider.request_count(), 1);

    // Retry affordance: the user taps "allow camera" again.
    assert_eq!(gate.request_permission().await, PermissionState::Denied);
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn permission_retry_tests_granted_provider_skips_prompt() {
    let provider = Arc::new(StaticPermissionProvider::granted());
    let gate = PermissionGate::new(provider.clone());

    assert_eq!(gate.query_permission().await, PermissionState::Granted);
    assert!(gate.ensure_granted().await.is_ok());
    assert_eq!(provider.request_count(), 0);
}
