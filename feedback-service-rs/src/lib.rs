//! # Feedback Service
//!
//! Terminal stage of the chain. Turns the image type, the findings and the
//! model name into a patient-facing narrative. It never forwards; its answer
//! is a flat JSON object which the Analysis stage folds into the envelope.
//!
//! When the summarizer fails the stage still answers 200 with a placeholder
//! narrative and the fault in `error`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use error_handling_rs::ErrorInfo;
use shared_types_rs::{
    parse_findings, Envelope, FeedbackContribution, FeedbackRequest, FeedbackResponse, Finding,
    HealthResponse, StageName, FEEDBACK_PLACEHOLDER, PENDING_VALUE,
};
use stage_sdk::{execute, request_id, with_common_layers, ServiceInfo, Stage, StageRejection, Summarizer};

/// Validated input of one feedback request
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackInput {
    pub image_type: String,
    pub analysis_result: String,
    pub model_used: String,
    pub findings: Vec<Finding>,
}

impl FeedbackInput {
    /// Check the required fields. Findings fall back to whatever can be read
    /// out of `analysis_result` when the caller sent text only.
    pub fn from_request(request: FeedbackRequest) -> Result<Self, StageRejection> {
        let image_type = non_blank(request.image_type).ok_or(StageRejection::MissingField("image_type"))?;
        let analysis_result =
            non_blank(request.analysis_result).ok_or(StageRejection::MissingField("analysis_result"))?;
        let model_used = non_blank(request.model_used).unwrap_or_else(|| PENDING_VALUE.to_string());

        let findings = if request.findings.is_empty() {
            parse_findings(&analysis_result)
        } else {
            request.findings
        };

        Ok(Self {
            image_type,
            analysis_result,
            model_used,
            findings,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct FeedbackStage {
    summarizer: Arc<dyn Summarizer>,
}

impl FeedbackStage {
    pub fn new(summarizer: Arc<dyn Summarizer>) -> Self {
        Self { summarizer }
    }
}

#[async_trait]
impl Stage for FeedbackStage {
    type Input = FeedbackInput;

    fn name(&self) -> StageName {
        StageName::Feedback
    }

    async fn contribute(&self, input: &FeedbackInput, envelope: &mut Envelope) -> Option<ErrorInfo> {
        let (feedback, fault) = match self
            .summarizer
            .summarize(&input.image_type, &input.findings, &input.model_used)
            .await
        {
            Ok(text) => (text, None),
            Err(e) => (
                FEEDBACK_PLACEHOLDER.to_string(),
                Some(ErrorInfo::capability_failure(e.to_string(), self.name().as_str())),
            ),
        };

        envelope.record_feedback(FeedbackContribution {
            image_type: input.image_type.clone(),
            analysis_result: input.analysis_result.clone(),
            model_used: input.model_used.clone(),
            feedback,
        });
        fault
    }
}

pub struct FeedbackService {
    stage: FeedbackStage,
    info: ServiceInfo,
    max_body_bytes: usize,
}

impl FeedbackService {
    pub fn new(summarizer: Arc<dyn Summarizer>, max_body_bytes: usize) -> Self {
        Self {
            stage: FeedbackStage::new(summarizer),
            info: ServiceInfo::new("feedback-service"),
            max_body_bytes,
        }
    }

    pub fn create_router(self: Arc<Self>) -> Router {
        let max_body_bytes = self.max_body_bytes;
        let router = Router::new()
            .route(StageName::Feedback.endpoint(), post(Self::feedback_handler))
            .route("/health", get(Self::health_handler))
            .with_state(self);

        with_common_layers(router, max_body_bytes)
    }

    /// POST /generate-feedback - JSON body, whatever the content type says
    async fn feedback_handler(
        State(state): State<Arc<Self>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Json<FeedbackResponse>, StageRejection> {
        let request_id = request_id(&headers);

        let request: FeedbackRequest =
            serde_json::from_slice(&body).map_err(|e| StageRejection::InvalidJson(e.to_string()))?;
        let input = FeedbackInput::from_request(request)?;

        tracing::info!(
            %request_id,
            image_type = %input.image_type,
            findings = input.findings.len(),
            "Feedback request received"
        );

        let envelope = execute(&state.stage, &request_id, input).await;
        let contribution = envelope
            .stages()
            .feedback()
            .cloned()
            .ok_or_else(|| StageRejection::Internal("feedback was not recorded".to_string()))?;

        Ok(Json(FeedbackResponse {
            image_type: contribution.image_type,
            analysis_result: contribution.analysis_result,
            model_used: contribution.model_used,
            feedback: contribution.feedback,
            error: envelope.downstream_error().cloned(),
        }))
    }

    async fn health_handler(State(state): State<Arc<Self>>) -> Json<HealthResponse> {
        Json(state.info.health("SERVING"))
    }
}
