//! HTTP error handling and response types

use crate::recognizer::RecognitionError;
use crate::whitelist::WhitelistError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// API error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// Error type for HTTP handlers
#[derive(Debug)]
pub enum ApiError {
    /// Missing or unparseable input
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// OCR did not answer in time
    Timeout(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "OCR_TIMEOUT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = ErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<WhitelistError> for ApiError {
    fn from(err: WhitelistError) -> Self {
        match err {
            WhitelistError::AlreadyExists(plate) => {
                ApiError::Conflict(format!("plate {} already exists", plate))
            }
            WhitelistError::Database(e) => {
                error!("Whitelist storage failure: {}", e);
                ApiError::Internal("whitelist storage unavailable".to_string())
            }
        }
    }
}

impl From<RecognitionError> for ApiError {
    fn from(err: RecognitionError) -> Self {
        error!("Recognition failed: {}", err);
        match err {
            RecognitionError::Timeout(_) => ApiError::Timeout(err.to_string()),
            RecognitionError::Engine(_) => ApiError::Internal(err.to_string()),
        }
    }
}
