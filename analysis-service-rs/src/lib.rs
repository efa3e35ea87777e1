//! # Analysis Service
//!
//! Middle stage of the chain. Runs the diagnostic model over the image and
//! the detected type, then hands the findings to Feedback as JSON.

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
    render_findings, AnalysisContribution, Envelope, FeedbackRequest, FeedbackResponse, HealthResponse,
    ImagePayload, StageName, PENDING_VALUE,
};
use stage_sdk::{
    execute, request_id, with_common_layers, Analyzer, HopClient, ImageForm, ServiceInfo, Stage,
    StageRejection, UploadError,
};

/// Validated input of one analysis request
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub image: ImagePayload,
    pub image_type: String,
}

pub struct AnalysisStage {
    analyzer: Arc<dyn Analyzer>,
    feedback: HopClient,
}

impl AnalysisStage {
    pub fn new(analyzer: Arc<dyn Analyzer>, feedback: HopClient) -> Self {
        Self { analyzer, feedback }
    }
}

#[async_trait]
impl Stage for AnalysisStage {
    type Input = AnalysisInput;

    fn name(&self) -> StageName {
        StageName::Analysis
    }

    async fn contribute(&self, input: &AnalysisInput, envelope: &mut Envelope) -> Option<ErrorInfo> {
        match self.analyzer.analyze(&input.image, &input.image_type).await {
            Ok(report) => {
                envelope.record_analysis(AnalysisContribution {
                    model_used: report.model_name,
                    analysis_result: render_findings(&report.findings),
                    findings: report.findings,
                });
                None
            }
            Err(e) => {
                envelope.record_analysis(AnalysisContribution {
                    model_used: PENDING_VALUE.to_string(),
                    analysis_result: PENDING_VALUE.to_string(),
                    findings: Vec::new(),
                });
                Some(ErrorInfo::capability_failure(e.to_string(), self.name().as_str()))
            }
        }
    }

    async fn forward(&self, input: &AnalysisInput, envelope: &Envelope) -> Option<Result<Envelope, ErrorInfo>> {
        let request = FeedbackRequest {
            image_type: Some(input.image_type.clone()),
            analysis_result: envelope.analysis_result().map(str::to_string),
            model_used: envelope.model_used().map(str::to_string),
            findings: envelope.findings().map(<[_]>::to_vec).unwrap_or_default(),
        };
        let request_id = envelope.request_id().unwrap_or_default();

        Some(
            self.feedback
                .post_json::<_, FeedbackResponse>(request_id, &request)
                .await
                .map(Envelope::from),
        )
    }
}

pub struct AnalysisService {
    stage: AnalysisStage,
    info: ServiceInfo,
    max_upload_bytes: usize,
}

impl AnalysisService {
    pub fn new(analyzer: Arc<dyn Analyzer>, feedback: HopClient, max_upload_bytes: usize) -> Self {
        Self {
            stage: AnalysisStage::new(analyzer, feedback),
            info: ServiceInfo::new("analysis-service"),
            max_upload_bytes,
        }
    }

    pub fn create_router(self: Arc<Self>) -> Router {
        let max_upload_bytes = self.max_upload_bytes;
        let router = Router::new()
            .route(StageName::Analysis.endpoint(), post(Self::process_handler))
            .route("/health", get(Self::health_handler))
            .with_state(self);

        with_common_layers(router, max_upload_bytes)
    }

    /// POST /process-image - multipart `image` + `image_type`
    async fn process_handler(
        State(state): State<Arc<Self>>,
        headers: HeaderMap,
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Json<Envelope>, StageRejection> {
        let request_id = request_id(&headers);

        let mut form = ImageForm::read(multipart.map_err(UploadError::from)?).await?;
        let image = form.take_image()?;
        let image_type = form
            .text(IMAGE_TYPE_FIELD)
            .ok_or(StageRejection::MissingField(IMAGE_TYPE_FIELD))?
            .to_string();

        tracing::info!(%request_id, %image_type, size = image.len(), "Analysis request received");

        let input = AnalysisInput { image, image_type };
        Ok(Json(execute(&state.stage, &request_id, input).await))
    }

    async fn health_handler(State(state): State<Arc<Self>>) -> Json<HealthResponse> {
        Json(state.info.health("SERVING"))
    }
}
