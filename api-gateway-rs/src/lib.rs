use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shared_types_rs::{Envelope, HealthResponse};
use stage_sdk::{request_id, HopClient, ImageForm, ServiceInfo, UploadError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod validation;

use validation::{hop_failure_response, payload_limit_config, validate_upload, ApiValidationError};

/// Body of a successful upload: the relayed envelope plus the narrative
/// lifted to the top level.
#[derive(Debug, Serialize, Deserialize)]
pub struct GatewayResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_feedback: Option<String>,
}

impl From<Envelope> for GatewayResponse {
    fn from(envelope: Envelope) -> Self {
        let final_feedback = envelope
            .feedback()
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string);

        Self {
            envelope,
            final_feedback,
        }
    }
}

/// Core API Gateway state and functionality
pub struct ApiGateway {
    detection: HopClient,
    info: ServiceInfo,
    max_upload_bytes: usize,
}

impl ApiGateway {
    pub fn new(detection: HopClient, max_upload_bytes: usize) -> Self {
        Self {
            detection,
            info: ServiceInfo::new("api-gateway"),
            max_upload_bytes,
        }
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(self: Arc<Self>) -> Router {
        let max_upload_bytes = self.max_upload_bytes;
        Router::new()
            .route("/", get(Self::root_handler))
            .route("/health", get(Self::health_handler))
            .route("/upload", post(Self::upload_handler))
            .layer(payload_limit_config(max_upload_bytes))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .with_state(self)
    }

    async fn root_handler() -> impl IntoResponse {
        Json(serde_json::json!({
            "service": "Medical Image Report Gateway",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": [
                "GET /health",
                "POST /upload"
            ]
        }))
    }

    /// GET /health - gateway uptime and whether Detection answers
    async fn health_handler(State(state): State<Arc<Self>>) -> Json<HealthResponse> {
        let status = if state.detection.probe_health().await {
            "SERVING"
        } else {
            "DEGRADED"
        };
        Json(state.info.health(status))
    }

    /// POST /upload - multipart `image`
    async fn upload_handler(
        State(state): State<Arc<Self>>,
        headers: HeaderMap,
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Response {
        let request_id = request_id(&headers);

        let image = match Self::read_upload(multipart).await {
            Ok(image) => image,
            Err(err) => return err.into_response(),
        };

        tracing::info!(
            %request_id,
            filename = %image.filename(),
            size = image.len(),
            "Upload received, calling Detection"
        );

        match state.detection.post_image::<Envelope>(&request_id, &image, &[]).await {
            Ok(envelope) => {
                tracing::info!(
                    %request_id,
                    reached = ?envelope.reached_stages(),
                    downstream_error = ?envelope.downstream_error().map(|e| e.kind),
                    "Pipeline completed"
                );
                Json(GatewayResponse::from(envelope)).into_response()
            }
            Err(fault) => {
                fault.log();
                hop_failure_response(fault).into_response()
            }
        }
    }

    async fn read_upload(
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<shared_types_rs::ImagePayload, ApiValidationError> {
        let multipart = multipart.map_err(UploadError::from)?;
        let mut form = ImageForm::read(multipart).await?;
        validate_upload(&mut form)
    }
}
