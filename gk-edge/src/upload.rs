//! Upload client: one plate crop → one multipart POST to the gateway
//!
//! Failures are classified so the capture loop can log them distinctly.
//! Nothing here retries; the next frame is the retry.

use gk_common::api::RecognitionResponse;
use gk_common::imaging::encode_jpeg;
use image::DynamicImage;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

const USER_AGENT: &str = concat!("gk-edge/", env!("CARGO_PKG_VERSION"));

/// Upload failures
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to encode crop: {0}")]
    Encode(String),

    #[error("Gateway unreachable: {0}")]
    Unreachable(String),

    #[error("Upload timed out after {0:?}")]
    Timeout(Duration),

    #[error("Gateway answered HTTP {0}")]
    Status(u16),

    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// HTTP client bound to one gateway recognition endpoint
pub struct UploadClient {
    http_client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    jpeg_quality: u8,
}

impl UploadClient {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        jpeg_quality: u8,
    ) -> Result<Self, UploadError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            timeout,
            jpeg_quality,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Encode `crop` as JPEG and submit it; the decoded decision on HTTP 200
    pub async fn upload(&self, crop: &DynamicImage) -> Result<RecognitionResponse, UploadError> {
        let jpeg =
            encode_jpeg(crop, self.jpeg_quality).map_err(|e| UploadError::Encode(e.to_string()))?;
        debug!(bytes = jpeg.len(), "Uploading plate crop");

        let part = Part::bytes(jpeg)
            .file_name("plate.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| UploadError::Encode(e.to_string()))?;
        let form = Form::new().part("image", part);

        let response = self
            .http_client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UploadError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        serde_json::from_slice(&body).map_err(|e| UploadError::MalformedResponse(e.to_string()))
    }

    /// Upload and log the outcome; `true` when the gateway answered
    pub async fn upload_and_log(&self, crop: &DynamicImage) -> bool {
        match self.upload(crop).await {
            Ok(decision) => {
                let plate = decision.plate.as_deref().unwrap_or("unknown");
                if decision.allowed {
                    info!(plate, "Access granted");
                } else if decision.cooldown {
                    info!("Gateway cooling down");
                } else {
                    info!(plate, message = %decision.message, "Access denied");
                }
                true
            }
            Err(UploadError::Unreachable(e)) => {
                error!("Gateway unreachable at {}: {}", self.endpoint, e);
                false
            }
            Err(UploadError::Timeout(after)) => {
                error!("Upload timeout after {:?}", after);
                false
            }
            Err(UploadError::Status(code)) => {
                warn!("Upload failed, HTTP status {}", code);
                false
            }
            Err(e) => {
                error!("Upload failed: {}", e);
                false
            }
        }
    }

    fn classify(&self, err: reqwest::Error) -> UploadError {
        // Connect timeouts report both; timeout wins
        if err.is_timeout() {
            UploadError::Timeout(self.timeout)
        } else if err.is_connect() {
            UploadError::Unreachable(err.to_string())
        } else {
            UploadError::Network(err.to_string())
        }
    }
}
