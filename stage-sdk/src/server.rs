//! Shared HTTP plumbing for the stage services: rejections, health, request
//! ids, common layers and graceful serving.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use error_handling_rs::ErrorKind;
use shared_types_rs::{ErrorResponse, HealthResponse, REQUEST_ID_HEADER};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::upload::UploadError;

/// A stage refusing a malformed request. No downstream call has been made.
#[derive(Error, Debug)]
pub enum StageRejection {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StageRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            StageRejection::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StageRejection::Upload(UploadError::TooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Everything but an internal error is a payload the stage refused.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            StageRejection::Internal(_) => None,
            _ => Some(ErrorKind::BadPayload),
        }
    }
}

impl IntoResponse for StageRejection {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Rejecting request");
        (
            self.status(),
            Json(ErrorResponse {
                error: self.to_string(),
                kind: self.kind(),
            }),
        )
            .into_response()
    }
}

/// Identity and start time of a running service, for `/health`.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    service_name: String,
    started: Instant,
}

impl ServiceInfo {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            started: Instant::now(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn health(&self, status: &str) -> HealthResponse {
        HealthResponse {
            healthy: true,
            service_name: self.service_name.clone(),
            uptime_seconds: self.uptime_seconds(),
            status: status.to_string(),
        }
    }
}

/// The caller's correlation id, or a fresh one.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Request tracing plus an upload size cap in place of axum's 2MB default.
pub fn with_common_layers(router: Router, max_upload_bytes: usize) -> Router {
    router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve(router: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");
    serve_on(router, listener).await
}

pub async fn serve_on(router: Router, listener: TcpListener) -> std::io::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down gracefully"),
        _ = terminate => tracing::info!("Received termination signal, shutting down gracefully"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_id_is_propagated_or_generated() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-42"));
        assert_eq!(request_id(&headers), "req-42");

        let generated = request_id(&HeaderMap::new());
        assert!(uuid::Uuid::parse_str(&generated).is_ok());
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(
            StageRejection::MissingField("image_type").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StageRejection::Upload(UploadError::MissingImage).to_string(),
            "No image provided"
        );
        assert_eq!(
            StageRejection::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            StageRejection::Upload(UploadError::TooLarge).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn test_rejection_body_names_bad_payload() {
        let response = StageRejection::MissingField("image_type").into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "Missing required field: image_type");
        assert_eq!(body.kind, Some(ErrorKind::BadPayload));

        let response = StageRejection::Internal("boom".into()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body.get("kind").is_none());
    }

    #[test]
    fn test_health_report() {
        let info = ServiceInfo::new("feedback-service");
        let health = info.health("SERVING");
        assert!(health.healthy);
        assert_eq!(health.service_name, "feedback-service");
        assert_eq!(health.status, "SERVING");
    }
}
