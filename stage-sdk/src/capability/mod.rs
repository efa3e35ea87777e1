//! Capability provider interfaces
//!
//! The three model-backed functions the stages wrap. Implementations are
//! injected into a stage at construction time and must tolerate concurrent
//! calls from many in-flight requests; any queuing they need is their own
//! business.
//!
//! - `Classifier`: image -> image type label
//! - `Analyzer`: image + label -> model name and findings
//! - `Summarizer`: label + findings + model name -> patient-facing narrative

use async_trait::async_trait;
use shared_types_rs::{Finding, ImagePayload};
use thiserror::Error;

mod defaults;
pub use defaults::{FixedClassifier, PendingAnalyzer, TemplateSummarizer};

/// Error raised by a capability provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    /// The provider ran and failed
    #[error("{0}")]
    Failed(String),
}

impl CapabilityError {
    pub fn failed(message: impl Into<String>) -> Self {
        CapabilityError::Failed(message.into())
    }
}

/// Explicit provider lifecycle, driven by the service binary around `serve`.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Provider name, for logs
    fn name(&self) -> &str;

    /// Load whatever the provider needs (weights, connections)
    async fn initialize(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    /// Release resources; called once after the server stops
    async fn shutdown(&self) {}
}

#[async_trait]
pub trait Classifier: Lifecycle {
    async fn classify(&self, image: &ImagePayload) -> Result<String, CapabilityError>;
}

/// Output of an [`Analyzer`]
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub model_name: String,
    pub findings: Vec<Finding>,
}

#[async_trait]
pub trait Analyzer: Lifecycle {
    async fn analyze(&self, image: &ImagePayload, label: &str) -> Result<AnalysisReport, CapabilityError>;
}

#[async_trait]
pub trait Summarizer: Lifecycle {
    async fn summarize(
        &self,
        label: &str,
        findings: &[Finding],
        model_name: &str,
    ) -> Result<String, CapabilityError>;
}
