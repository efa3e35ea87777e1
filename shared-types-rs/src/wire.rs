//! Request and response bodies exchanged between the services.

use error_handling_rs::{ErrorInfo, ErrorKind};
use serde::{Deserialize, Serialize};

use crate::envelope::{Envelope, FeedbackContribution};
use crate::findings::Finding;

/// Correlation header forwarded on every hop.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Multipart part carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Multipart text field carrying the detected image type.
pub const IMAGE_TYPE_FIELD: &str = "image_type";

/// JSON body of `POST /generate-feedback`.
///
/// Every field is optional on the wire so the stage can name exactly which
/// required one is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub image_type: Option<String>,
    #[serde(default)]
    pub analysis_result: Option<String>,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
}

/// JSON answer of `POST /generate-feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub image_type: String,
    pub analysis_result: String,
    pub model_used: String,
    pub feedback: String,
    /// Present when the summarizer failed and `feedback` is a placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl FeedbackResponse {
    pub fn contribution(&self) -> FeedbackContribution {
        FeedbackContribution {
            image_type: self.image_type.clone(),
            analysis_result: self.analysis_result.clone(),
            model_used: self.model_used.clone(),
            feedback: self.feedback.clone(),
        }
    }
}

/// Lift the terminal stage's answer into an envelope the caller can absorb.
/// A degraded answer carries its fault along.
impl From<FeedbackResponse> for Envelope {
    fn from(response: FeedbackResponse) -> Self {
        let mut envelope = Envelope::default();
        envelope.record_feedback(response.contribution());
        if let Some(fault) = response.error {
            envelope.record_fault(fault);
        }
        envelope
    }
}

/// Body of a stage's rejection. Malformed input carries `kind: BadPayload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service_name: String,
    pub uptime_seconds: u64,
    pub status: String,
}
