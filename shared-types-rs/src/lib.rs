pub mod envelope;
pub mod findings;
pub mod labels;
pub mod payload;
pub mod stage;
pub mod wire;

pub use envelope::{
    AnalysisContribution, DetectionContribution, Envelope, FeedbackContribution, StageContributions,
};
pub use findings::{parse_findings, render_findings, Finding};
pub use labels::{normalize_image_type, FEEDBACK_PLACEHOLDER, PENDING_VALUE, UNKNOWN_IMAGE_TYPE};
pub use payload::{is_allowed_image, ImagePayload, ALLOWED_EXTENSIONS};
pub use stage::StageName;
pub use wire::{ErrorResponse, FeedbackRequest, FeedbackResponse, HealthResponse, REQUEST_ID_HEADER};

// Re-export the fault types carried inside envelopes
pub use error_handling_rs::{ErrorInfo, ErrorKind};
