//! Shared fixtures for app integration tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gut_log_api::ApiConfig;
use gut_log_app::CaptureController;
use gut_log_capture::{CameraBackend, CaptureError, CaptureQuality, SyntheticCamera};
use gut_log_core::ImageHandle;
use gut_log_permission::{PermissionGate, StaticPermissionProvider};
use gut_log_upload::UploadClient;
use tokio::sync::Notify;

/// Config pointing at `base_url` with a short timeout.
#[allow(dead_code)]
pub fn config(base_url: &str) -> ApiConfig {
    ApiConfig::new(base_url, Duration::from_secs(2)).expect("valid config")
}

/// Controller with granted permission over the given camera.
#[allow(dead_code)]
pub fn granted_controller(base_url: &str, camera: Arc<dyn CameraBackend>) -> CaptureController {
    controller_with(
        base_url,
        camera,
        Arc::new(StaticPermissionProvider::granted()),
    )
}

/// Controller over an explicit permission provider.
#[allow(dead_code)]
pub fn controller_with(
    base_url: &str,
    camera: Arc<dyn CameraBackend>,
    provider: Arc<StaticPermissionProvider>,
) -> CaptureController {
    let config = config(base_url);
    CaptureController::new(
        PermissionGate::new(provider),
        camera,
        UploadClient::http(&config).expect("client should build"),
        CaptureQuality::DEFAULT,
    )
}

/// Camera whose device is always unavailable.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct BrokenCamera;

#[async_trait]
impl CameraBackend for BrokenCamera {
    async fn capture_still(&self, _quality: CaptureQuality) -> Result<ImageHandle, CaptureError> {
        Err(CaptureError::Device("camera unavailable".to_string()))
    }
}

/// Camera that blocks until released, then delegates to a synthetic camera.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct GatedCamera {
    /// Wakes the pending capture.
    pub release: Notify,
    inner: SyntheticCamera,
}

#[async_trait]
impl CameraBackend for GatedCamera {
    async fn capture_still(&self, quality: CaptureQuality) -> Result<ImageHandle, CaptureError> {
        self.release.notified().await;
        self.inner.capture_still(quality).await
    }
}
