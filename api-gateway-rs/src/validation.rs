//! API Gateway Input Validation
//!
//! Upload checks for the public entry point. The gateway answers with
//! `{message}` bodies, unlike the stages which answer with `{error}`.

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use error_handling_rs::{ErrorInfo, ErrorKind};
use shared_types_rs::ImagePayload;
use stage_sdk::{ensure_allowed_type, ImageForm, UploadError};

/// Error response for validation failures
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ValidationErrorResponse {
    pub message: String,
    pub code: u16,
}

/// Validation error for uploads
#[derive(Debug, thiserror::Error)]
pub enum ApiValidationError {
    #[error("No file part")]
    NoFilePart,

    #[error("No selected file")]
    NoSelectedFile,

    #[error("Invalid file type")]
    InvalidFileType,

    #[error("File too large")]
    PayloadTooLarge,

    #[error("Invalid request format: {0}")]
    InvalidFormat(String),
}

impl ApiValidationError {
    /// Convert to HTTP status code and error response
    pub fn to_response(&self) -> (StatusCode, Json<ValidationErrorResponse>) {
        let status = match self {
            ApiValidationError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        (
            status,
            Json(ValidationErrorResponse {
                message: self.to_string(),
                code: status.as_u16(),
            }),
        )
    }
}

impl From<UploadError> for ApiValidationError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::MissingImage => Self::NoFilePart,
            UploadError::EmptyFilename => Self::NoSelectedFile,
            UploadError::UnsupportedType => Self::InvalidFileType,
            UploadError::TooLarge => Self::PayloadTooLarge,
            UploadError::Malformed(message) => Self::InvalidFormat(message),
        }
    }
}

impl IntoResponse for ApiValidationError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Rejecting upload");
        self.to_response().into_response()
    }
}

/// The image to forward, or the first failed check.
pub fn validate_upload(form: &mut ImageForm) -> Result<ImagePayload, ApiValidationError> {
    let image = form.take_image()?;
    ensure_allowed_type(&image)?;
    Ok(image)
}

/// Body of a failed Gateway→Detection hop. `gateway_error` is distinct from
/// any `downstream_error`, which only exists once Detection has answered.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct GatewayErrorResponse {
    pub message: String,
    pub gateway_error: ErrorInfo,
}

/// Status and body for a failed hop into Detection.
pub fn hop_failure_response(fault: ErrorInfo) -> (StatusCode, Json<GatewayErrorResponse>) {
    let (status, message) = match fault.kind {
        ErrorKind::Timeout => (
            StatusCode::GATEWAY_TIMEOUT,
            "Detection service did not respond in time",
        ),
        ErrorKind::Unreachable => (StatusCode::BAD_GATEWAY, "Detection service is not reachable"),
        ErrorKind::BadPayload => (
            StatusCode::BAD_GATEWAY,
            "Detection service returned an unreadable response",
        ),
        _ => (StatusCode::BAD_GATEWAY, "Error communicating with Detection service"),
    };

    (
        status,
        Json(GatewayErrorResponse {
            message: message.to_string(),
            gateway_error: fault,
        }),
    )
}

/// Upload size cap. Enforced while the multipart body is read, so an
/// oversized upload surfaces as [`ApiValidationError::PayloadTooLarge`].
pub fn payload_limit_config(max_upload_bytes: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_upload_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_errors_keep_gateway_messages() {
        let cases = [
            (UploadError::MissingImage, "No file part"),
            (UploadError::EmptyFilename, "No selected file"),
            (UploadError::UnsupportedType, "Invalid file type"),
        ];

        for (upload_error, message) in cases {
            let (status, Json(body)) = ApiValidationError::from(upload_error).to_response();
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body.message, message);
            assert_eq!(body.code, 400);
        }

        let (status, Json(body)) = ApiValidationError::from(UploadError::TooLarge).to_response();
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body.message, "File too large");
        assert_eq!(body.code, 413);
    }

    #[test]
    fn test_hop_failure_status() {
        let (status, Json(body)) = hop_failure_response(ErrorInfo::timeout("no response within 150000ms", "Detection"));
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body.gateway_error.origin_stage, "Detection");

        let (status, _) = hop_failure_response(ErrorInfo::unreachable("connection refused", "Detection"));
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, Json(body)) = hop_failure_response(ErrorInfo::bad_status("status code 500: boom", "Detection"));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.gateway_error.kind, ErrorKind::BadStatus);
    }
}
