#![warn(missing_docs)]
//! # gut-log-capture
//!
//! ## Purpose
//! Provides still-image acquisition and the capture re-entrancy lock.
//!
//! ## Responsibilities
//! - Define a backend-agnostic [`CameraBackend`] trait.
//! - Compress every still at a fixed reduced [`CaptureQuality`] so uploads
//!   stay small on constrained networks.
//! - Expose a file-backed camera for the command-line shell and a
//!   deterministic synthetic camera for tests and CI.
//! - Track [`CaptureState`] through [`CaptureLock`], whose session guard
//!   returns the state to idle on every exit path.
//!
//! ## Data flow
//! Capture controller takes a [`CaptureSession`] -> backend captures one
//! [`gut_log_core::ImageHandle`] -> handle goes to the upload client -> session
//! drops and the lock returns to idle.
//!
//! ## Ownership and lifetimes
//! Captured images own their encoded buffer. The camera is held exclusively
//! for the lifetime of one [`CaptureSession`].
//!
//! ## Error model
//! Invalid quality, unavailable devices, and encode failures are reported as
//! [`CaptureError`] values.
//!
//! ## Security and privacy notes
//! Backends never write captured bytes to disk.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use gut_log_core::ImageHandle;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, RgbImage};
use thiserror::Error;
use tracing::debug;

/// MIME type of every captured still.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Longest edge kept by the file camera; larger inputs are downscaled.
pub const MAX_CAPTURE_EDGE: u32 = 1280;

/// Compression factor applied to every still.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureQuality(f32);

impl CaptureQuality {
    /// Fixed medium fidelity used by the capture screen.
    pub const DEFAULT: CaptureQuality = CaptureQuality(0.5);

    /// Creates a validated quality factor.
    ///
    /// # Errors
    /// Returns [`CaptureError::InvalidQuality`] unless `0 < factor <= 1`.
    pub fn new(factor: f32) -> Result<Self, CaptureError> {
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(CaptureError::InvalidQuality(factor));
        }
        Ok(Self(factor))
    }

    /// Raw factor in `(0, 1]`.
    pub fn factor(self) -> f32 {
        self.0
    }

    /// JPEG encoder quality in `1..=100`.
    pub fn jpeg_quality(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for CaptureQuality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Trait implemented by concrete camera providers.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Acquires one still image encoded at `quality`.
    ///
    /// # Errors
    /// Returns [`CaptureError::Device`] or [`CaptureError::Encode`] when the
    /// still cannot be produced.
    async fn capture_still(&self, quality: CaptureQuality) -> Result<ImageHandle, CaptureError>;
}

/// Whether a capture is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    /// Ready for a new capture.
    #[default]
    Idle,
    /// A capture and its upload are in progress.
    CapturingAndUploading,
}

/// Re-entrancy lock around the camera.
#[derive(Debug, Default)]
pub struct CaptureLock {
    state: Mutex<CaptureState>,
}

impl CaptureLock {
    /// Creates an idle lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state snapshot.
    pub fn state(&self) -> CaptureState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to [`CaptureState::CapturingAndUploading`].
    ///
    /// Returns `None` when a capture is already running; callers reject the
    /// request instead of queueing it.
    pub fn try_begin(&self) -> Option<CaptureSession<'_>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != CaptureState::Idle {
            return None;
        }
        *state = CaptureState::CapturingAndUploading;
        debug!(target: "gut_log::capture", "capture session started");
        Some(CaptureSession { lock: self })
    }
}

/// Exclusive hold on the camera; resets the lock to idle when dropped.
#[derive(Debug)]
pub struct CaptureSession<'a> {
    lock: &'a CaptureLock,
}

impl Drop for CaptureSession<'_> {
    fn drop(&mut self) {
        *self
            .lock
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = CaptureState::Idle;
        debug!(target: "gut_log::capture", "capture session ended");
    }
}

/// Camera that reads a still from an image file.
#[derive(Debug, Clone)]
pub struct FileCamera {
    path: PathBuf,
}

impl FileCamera {
    /// Creates a camera bound to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Source image path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CameraBackend for FileCamera {
    async fn capture_still(&self, quality: CaptureQuality) -> Result<ImageHandle, CaptureError> {
        let raw = tokio::fs::read(&self.path).await.map_err(|error| {
            CaptureError::Device(format!("unable to read {}: {error}", self.path.display()))
        })?;
        let decoded = image::load_from_memory(&raw)
            .map_err(|error| CaptureError::Device(format!("unsupported image: {error}")))?;

        let bounded = if decoded.width().max(decoded.height()) > MAX_CAPTURE_EDGE {
            decoded.resize(MAX_CAPTURE_EDGE, MAX_CAPTURE_EDGE, FilterType::Triangle)
        } else {
            decoded
        };

        encode_jpeg(&bounded.to_rgb8(), quality)
    }
}

/// Deterministic camera for test and CI usage.
#[derive(Debug)]
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    sequence: Mutex<u64>,
}

impl SyntheticCamera {
    /// Creates a synthetic camera producing 64x48 stills.
    pub fn new() -> Self {
        Self::with_size(64, 48)
    }

    /// Creates a synthetic camera producing stills of the given size.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sequence: Mutex::new(0),
        }
    }

    /// Number of stills produced so far.
    pub fn captures(&self) -> u64 {
        *self.sequence.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraBackend for SyntheticCamera {
    async fn capture_still(&self, quality: CaptureQuality) -> Result<ImageHandle, CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::Device(
                "synthetic camera has zero-sized sensor".to_string(),
            ));
        }

        let seed = {
            let mut sequence = self.sequence.lock().unwrap_or_else(PoisonError::into_inner);
            *sequence += 1;
            *sequence
        };

        let frame = RgbImage::from_fn(self.width, self.height, |x, y| {
            let shade = ((x + y) as u64 + seed) % 255;
            image::Rgb([shade as u8, 96, 48])
        });

        encode_jpeg(&frame, quality)
    }
}

/// Encodes an RGB frame as JPEG at `quality`.
///
/// # Errors
/// Returns [`CaptureError::Encode`] when the encoder fails.
pub fn encode_jpeg(frame: &RgbImage, quality: CaptureQuality) -> Result<ImageHandle, CaptureError> {
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality.jpeg_quality())
        .encode(
            frame.as_raw(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|error| CaptureError::Encode(error.to_string()))?;

    ImageHandle::new(
        buffer.into_inner(),
        JPEG_CONTENT_TYPE,
        frame.width(),
        frame.height(),
    )
    .map_err(|error| CaptureError::Encode(error.to_string()))
}

/// Decodes a captured still back into pixels.
///
/// # Errors
/// Returns [`CaptureError::Encode`] when the bytes are not a readable image.
pub fn decode_still(handle: &ImageHandle) -> Result<DynamicImage, CaptureError> {
    image::load_from_memory(handle.bytes()).map_err(|error| CaptureError::Encode(error.to_string()))
}

/// Capture layer error type.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Quality factor outside `(0, 1]`.
    #[error("invalid capture quality {0}: must be in (0, 1]")]
    InvalidQuality(f32),
    /// Camera could not produce a still.
    #[error("camera failure: {0}")]
    Device(String),
    /// Still could not be compressed.
    #[error("image encode failure: {0}")]
    Encode(String),
}
