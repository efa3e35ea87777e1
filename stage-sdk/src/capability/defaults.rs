//! Deterministic stand-in providers used by the service binaries until a
//! real model is wired in.

use async_trait::async_trait;
use shared_types_rs::{render_findings, Finding, ImagePayload, PENDING_VALUE};

use super::{AnalysisReport, Analyzer, CapabilityError, Classifier, Lifecycle, Summarizer};

/// Reports the same label for every image.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    label: String,
}

impl FixedClassifier {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    /// Label from `DETECTION_DEFAULT_LABEL`, `X-ray` when unset.
    pub fn from_env() -> Self {
        Self::new(std::env::var("DETECTION_DEFAULT_LABEL").unwrap_or_else(|_| "X-ray".to_string()))
    }
}

#[async_trait]
impl Lifecycle for FixedClassifier {
    fn name(&self) -> &str {
        "fixed-classifier"
    }
}

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, image: &ImagePayload) -> Result<String, CapabilityError> {
        if image.is_empty() {
            return Err(CapabilityError::failed("image is empty"));
        }
        Ok(self.label.clone())
    }
}

/// Analyzer placeholder: no model, no findings.
#[derive(Debug, Clone, Default)]
pub struct PendingAnalyzer;

#[async_trait]
impl Lifecycle for PendingAnalyzer {
    fn name(&self) -> &str {
        "pending-analyzer"
    }
}

#[async_trait]
impl Analyzer for PendingAnalyzer {
    async fn analyze(&self, _image: &ImagePayload, _label: &str) -> Result<AnalysisReport, CapabilityError> {
        Ok(AnalysisReport {
            model_name: PENDING_VALUE.to_string(),
            findings: Vec::new(),
        })
    }
}

/// Fills a fixed sentence with the label, model and findings.
#[derive(Debug, Clone, Default)]
pub struct TemplateSummarizer;

#[async_trait]
impl Lifecycle for TemplateSummarizer {
    fn name(&self) -> &str {
        "template-summarizer"
    }
}

#[async_trait]
impl Summarizer for TemplateSummarizer {
    async fn summarize(
        &self,
        label: &str,
        findings: &[Finding],
        model_name: &str,
    ) -> Result<String, CapabilityError> {
        Ok(format!(
            "Advice based on {} using {}: {}",
            label,
            model_name,
            render_findings(findings)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImagePayload {
        ImagePayload::new(vec![0x89, b'P', b'N', b'G'], "scan.png", Some("image/png".to_string()))
    }

    #[tokio::test]
    async fn test_fixed_classifier() {
        let classifier = FixedClassifier::new("CT");
        assert!(classifier.initialize().await.is_ok());
        assert_eq!(classifier.classify(&image()).await.unwrap(), "CT");

        let empty = ImagePayload::new(Vec::new(), "scan.png", None);
        assert!(classifier.classify(&empty).await.is_err());
    }

    #[tokio::test]
    async fn test_pending_analyzer() {
        let report = PendingAnalyzer.analyze(&image(), "X-ray").await.unwrap();
        assert_eq!(report.model_name, "TBD");
        assert!(report.findings.is_empty());
    }

    #[tokio::test]
    async fn test_template_summarizer() {
        let findings = vec![Finding::new("FindingA", 0.8)];
        let text = TemplateSummarizer
            .summarize("X-ray", &findings, "DiagnosticModel")
            .await
            .unwrap();
        assert_eq!(text, "Advice based on X-ray using DiagnosticModel: FindingA (0.8)");
    }
}
