//! # Detection Service
//!
//! First stage of the chain. Classifies the uploaded image into an image
//! type, forwards the image and the type to the Analysis stage, and answers
//! with the merged envelope.
//!
//! A classifier failure does not stop the chain: the image type becomes
//! `Unknown` and the fault rides along in the envelope.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use error_handling_rs::ErrorInfo;
use shared_types_rs::wire::IMAGE_TYPE_FIELD;
use shared_types_rs::{
    normalize_image_type, DetectionContribution, Envelope, HealthResponse, ImagePayload, StageName,
    UNKNOWN_IMAGE_TYPE,
};
use stage_sdk::{
    ensure_allowed_type, execute, request_id, with_common_layers, Classifier, HopClient, ImageForm,
    ServiceInfo, Stage, StageRejection, UploadError,
};

/// Classifier plus the hop into Analysis.
pub struct DetectionStage {
    classifier: Arc<dyn Classifier>,
    analysis: HopClient,
}

impl DetectionStage {
    pub fn new(classifier: Arc<dyn Classifier>, analysis: HopClient) -> Self {
        Self { classifier, analysis }
    }
}

#[async_trait]
impl Stage for DetectionStage {
    type Input = ImagePayload;

    fn name(&self) -> StageName {
        StageName::Detection
    }

    async fn contribute(&self, image: &ImagePayload, envelope: &mut Envelope) -> Option<ErrorInfo> {
        let (image_type, fault) = match self.classifier.classify(image).await {
            Ok(label) => {
                let image_type = normalize_image_type(&label);
                tracing::debug!(raw_label = %label, %image_type, "Image classified");
                (image_type, None)
            }
            Err(e) => (
                UNKNOWN_IMAGE_TYPE.to_string(),
                Some(ErrorInfo::capability_failure(e.to_string(), self.name().as_str())),
            ),
        };

        envelope.record_detection(DetectionContribution { image_type });
        fault
    }

    async fn forward(&self, image: &ImagePayload, envelope: &Envelope) -> Option<Result<Envelope, ErrorInfo>> {
        let image_type = envelope.image_type().unwrap_or(UNKNOWN_IMAGE_TYPE);
        let request_id = envelope.request_id().unwrap_or_default();

        Some(
            self.analysis
                .post_image(request_id, image, &[(IMAGE_TYPE_FIELD, image_type)])
                .await,
        )
    }
}

/// HTTP front of the Detection stage
pub struct DetectionService {
    stage: DetectionStage,
    info: ServiceInfo,
    max_upload_bytes: usize,
}

impl DetectionService {
    pub fn new(classifier: Arc<dyn Classifier>, analysis: HopClient, max_upload_bytes: usize) -> Self {
        Self {
            stage: DetectionStage::new(classifier, analysis),
            info: ServiceInfo::new("detection-service"),
            max_upload_bytes,
        }
    }

    pub fn create_router(self: Arc<Self>) -> Router {
        let max_upload_bytes = self.max_upload_bytes;
        let router = Router::new()
            .route(StageName::Detection.endpoint(), post(Self::detect_handler))
            .route("/health", get(Self::health_handler))
            .with_state(self);

        with_common_layers(router, max_upload_bytes)
    }

    /// POST /detect-image - multipart `image`
    async fn detect_handler(
        State(state): State<Arc<Self>>,
        headers: HeaderMap,
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Json<Envelope>, StageRejection> {
        let request_id = request_id(&headers);

        let mut form = ImageForm::read(multipart.map_err(UploadError::from)?).await?;
        let image = form.take_image()?;
        ensure_allowed_type(&image)?;

        tracing::info!(
            %request_id,
            filename = %image.filename(),
            size = image.len(),
            "Detection request received"
        );

        Ok(Json(execute(&state.stage, &request_id, image).await))
    }

    async fn health_handler(State(state): State<Arc<Self>>) -> Json<HealthResponse> {
        Json(state.info.health("SERVING"))
    }
}
