//! Error types for dicomvault-server
//!
//! Every failure leaves the server as `{"success": false, "error": "..."}`.
//! Internal detail (paths, OS errors, task failures) is logged, never
//! returned to the client.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::dicom::DicomError;

/// Message returned for a missing (or provisional) record
pub const FILE_NOT_FOUND: &str = "file not found";

/// Message returned when a stored record is not parseable DICOM
pub const NOT_DICOM: &str = "not a valid DICOM file";

/// Message returned when pixel data cannot be rasterized
pub const CONVERSION_FAILED: &str = "unable to convert DICOM to png";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Study or record does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored record is not a valid DICOM file (422)
    #[error("Invalid format")]
    InvalidFormat,

    /// Request is missing or has malformed parameters (400)
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// Pixel data could not be rasterized (422)
    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    /// Request body exceeded the configured limit (413)
    #[error("Payload too large")]
    PayloadTooLarge,

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn file_not_found() -> Self {
        ApiError::NotFound(FILE_NOT_FOUND.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidFormat | ApiError::ConversionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::MalformedQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message
    pub fn public_message(&self) -> String {
        match self {
            ApiError::NotFound(msg) | ApiError::MalformedQuery(msg) => msg.clone(),
            ApiError::InvalidFormat => NOT_DICOM.to_string(),
            ApiError::ConversionFailed(_) => CONVERSION_FAILED.to_string(),
            ApiError::PayloadTooLarge => "upload exceeds the size limit".to_string(),
            ApiError::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl From<dicomvault_common::Error> for ApiError {
    fn from(err: dicomvault_common::Error) -> Self {
        match err {
            dicomvault_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            dicomvault_common::Error::InvalidInput(msg) => ApiError::MalformedQuery(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DicomError> for ApiError {
    fn from(err: DicomError) -> Self {
        if err.is_invalid_format() {
            ApiError::InvalidFormat
        } else {
            ApiError::ConversionFailed(err.to_string())
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::MalformedQuery(format!("invalid multipart body: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else if let ApiError::ConversionFailed(detail) = &self {
            warn!(detail = %detail, "Raster conversion failed");
        }

        let body = Json(json!({
            "success": false,
            "error": self.public_message(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
