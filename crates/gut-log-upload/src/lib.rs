#![warn(missing_docs)]
//! # gut-log-upload
//!
//! ## Purpose
//! Sends one captured still to the classification endpoint and maps the
//! answer into a [`ClassificationResult`].
//!
//! ## Responsibilities
//! - Package the image as a single multipart file field.
//! - Issue exactly one request per invocation through an injectable
//!   [`UploadTransport`]. There is no retry or backoff.
//! - Classify failures for diagnostics while keeping them distinct from
//!   capture failures.
//!
//! ## Data flow
//! [`ImageHandle`] -> [`UploadEnvelope`] -> transport `POST /predict` ->
//! [`gut_log_api::parse_prediction`] -> [`ClassificationResult`].
//!
//! ## Error model
//! Network, status, and decode failures return [`UploadError`].
//! [`classify_upload_error`] tags each one as transient or permanent; the tag
//! is logged but never drives an automatic retry.
//!
//! ## Security and privacy notes
//! Image bytes are never logged; logs carry only size and a digest prefix.

use std::sync::Arc;

use async_trait::async_trait;
use gut_log_api::{ApiConfig, PREDICT_FILE_FIELD, PREDICT_PATH, parse_prediction};
use gut_log_core::{ClassificationResult, ImageHandle};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Multipart request handed to a transport.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadEnvelope {
    /// Fully resolved `/predict` URL.
    pub url: Url,
    /// Multipart field name.
    pub field_name: &'static str,
    /// File name announced in the multipart part.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub content_type: String,
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadEnvelope")
            .field("url", &self.url.as_str())
            .field("field_name", &self.field_name)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Raw transport answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

/// Abstract transport used by the upload client.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Sends one multipart request.
    ///
    /// # Errors
    /// Returns [`UploadError::Network`] or [`UploadError::Timeout`] when no
    /// response was received.
    async fn send(&self, envelope: &UploadEnvelope) -> Result<TransportResponse, UploadError>;
}

/// `reqwest`-backed multipart transport.
#[derive(Debug, Clone)]
pub struct HttpUploadTransport {
    client: reqwest::Client,
}

impl HttpUploadTransport {
    /// Builds a transport with the configured request timeout.
    ///
    /// # Errors
    /// Returns [`UploadError::Setup`] when the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|error| UploadError::Setup(format!("http client: {error}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn send(&self, envelope: &UploadEnvelope) -> Result<TransportResponse, UploadError> {
        let part = reqwest::multipart::Part::bytes(envelope.bytes.clone())
            .file_name(envelope.file_name.clone())
            .mime_str(&envelope.content_type)
            .map_err(|error| UploadError::Setup(format!("content type: {error}")))?;
        let form = reqwest::multipart::Form::new().part(envelope.field_name, part);

        let response = self
            .client
            .post(envelope.url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(error_from_reqwest)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(error_from_reqwest)?;
        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn error_from_reqwest(error: reqwest::Error) -> UploadError {
    if error.is_timeout() {
        UploadError::Timeout
    } else {
        UploadError::Network(error.to_string())
    }
}

/// Classification upload client.
#[derive(Clone)]
pub struct UploadClient {
    endpoint: Url,
    transport: Arc<dyn UploadTransport>,
}

impl UploadClient {
    /// Creates a client that posts to `config`'s `/predict` endpoint.
    pub fn new(config: &ApiConfig, transport: Arc<dyn UploadTransport>) -> Self {
        Self {
            endpoint: config.endpoint(PREDICT_PATH),
            transport,
        }
    }

    /// Creates a client over [`HttpUploadTransport`].
    ///
    /// # Errors
    /// Returns [`UploadError::Setup`] when the HTTP client cannot be built.
    pub fn http(config: &ApiConfig) -> Result<Self, UploadError> {
        Ok(Self::new(config, Arc::new(HttpUploadTransport::new(config)?)))
    }

    /// Uploads one still and returns the server's classification.
    ///
    /// Exactly one request is made. Failures are returned immediately.
    ///
    /// # Errors
    /// Returns [`UploadError`] for network failures, non-success statuses, and
    /// malformed bodies.
    pub async fn classify(&self, image: &ImageHandle) -> Result<ClassificationResult, UploadError> {
        let envelope = UploadEnvelope {
            url: self.endpoint.clone(),
            field_name: PREDICT_FILE_FIELD,
            file_name: capture_file_name(image),
            content_type: image.content_type().to_string(),
            bytes: image.bytes().to_vec(),
        };

        let outcome = self.send_once(&envelope).await;
        match &outcome {
            Ok(result) => info!(
                target: "gut_log::upload",
                file_name = %envelope.file_name,
                bytes = envelope.bytes.len(),
                prediction = %result.prediction,
                "classification received"
            ),
            Err(error) => warn!(
                target: "gut_log::upload",
                file_name = %envelope.file_name,
                bytes = envelope.bytes.len(),
                class = ?classify_upload_error(error),
                %error,
                "classification upload failed"
            ),
        }
        outcome
    }

    async fn send_once(
        &self,
        envelope: &UploadEnvelope,
    ) -> Result<ClassificationResult, UploadError> {
        let response = self.transport.send(envelope).await?;
        match response.status {
            200..=299 => parse_prediction(&response.body)
                .map_err(|error| UploadError::Decode(error.to_string())),
            400..=499 => Err(UploadError::Client(response.status)),
            500..=599 => Err(UploadError::Server(response.status)),
            other => Err(UploadError::UnexpectedStatus(other)),
        }
    }

    /// Configured `/predict` URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl std::fmt::Debug for UploadClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

/// Stable multipart file name derived from the image digest.
pub fn capture_file_name(image: &ImageHandle) -> String {
    let digest = Sha256::digest(image.bytes());
    let extension = match image.content_type() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        _ => "bin",
    };
    format!("capture-{}.{extension}", hex::encode(&digest[..6]))
}

/// Diagnostic failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Might succeed if the user captures again.
    Transient,
    /// Will fail again for the same input.
    Permanent,
}

/// Classifies upload failures for diagnostics.
pub fn classify_upload_error(error: &UploadError) -> FailureClass {
    match error {
        UploadError::Network(_) | UploadError::Timeout | UploadError::Server(_) => {
            FailureClass::Transient
        }
        UploadError::Setup(_)
        | UploadError::Client(_)
        | UploadError::UnexpectedStatus(_)
        | UploadError::Decode(_) => FailureClass::Permanent,
    }
}

/// Upload layer error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Request could not be prepared.
    #[error("upload setup failure: {0}")]
    Setup(String),
    /// Connection-level failure.
    #[error("network failure: {0}")]
    Network(String),
    /// Request timed out.
    #[error("upload timed out")]
    Timeout,
    /// Server rejected the request (4xx).
    #[error("server rejected upload with status {0}")]
    Client(u16),
    /// Server failed (5xx).
    #[error("server failed with status {0}")]
    Server(u16),
    /// Status outside the 2xx/4xx/5xx ranges.
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
    /// Success status with an unreadable body.
    #[error("malformed classification response: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for file naming.

    use super::*;

    #[test]
    fn file_name_is_stable_per_content() {
        let image = ImageHandle::new(vec![1, 2, 3], "image/jpeg", 1, 1).expect("valid image");
        let again = ImageHandle::new(vec![1, 2, 3], "image/jpeg", 1, 1).expect("valid image");
        let other = ImageHandle::new(vec![3, 2, 1], "image/jpeg", 1, 1).expect("valid image");

        let name = capture_file_name(&image);
        assert!(name.starts_with("capture-"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), "capture-".len() + 12 + ".jpg".len());
        assert_eq!(name, capture_file_name(&again));
        assert_ne!(name, capture_file_name(&other));
    }
}
