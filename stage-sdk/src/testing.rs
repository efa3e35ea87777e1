//! Test helpers shared by the service crates (`test-util` feature).

use std::time::Duration;

use async_trait::async_trait;
use shared_types_rs::{Finding, ImagePayload};

use crate::capability::{AnalysisReport, Analyzer, CapabilityError, Classifier, Lifecycle, Summarizer};

pub const MULTIPART_BOUNDARY: &str = "pipeline-test-boundary";

/// `Content-Type` header value matching [`multipart_body`].
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY)
}

/// Hand-built `multipart/form-data` body with an optional image part
/// followed by text fields.
pub fn multipart_body(image: Option<(&str, &str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some((filename, content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                MULTIPART_BOUNDARY, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                MULTIPART_BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

/// A few bytes that start like a PNG.
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', 0, 0, 0, 13]
}

/// Provider whose every call fails with `message`.
#[derive(Debug, Clone)]
pub struct FailingProvider {
    message: String,
}

impl FailingProvider {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[async_trait]
impl Lifecycle for FailingProvider {
    fn name(&self) -> &str {
        "failing-provider"
    }
}

#[async_trait]
impl Classifier for FailingProvider {
    async fn classify(&self, _image: &ImagePayload) -> Result<String, CapabilityError> {
        Err(CapabilityError::failed(self.message.clone()))
    }
}

#[async_trait]
impl Analyzer for FailingProvider {
    async fn analyze(&self, _image: &ImagePayload, _label: &str) -> Result<AnalysisReport, CapabilityError> {
        Err(CapabilityError::failed(self.message.clone()))
    }
}

#[async_trait]
impl Summarizer for FailingProvider {
    async fn summarize(&self, _label: &str, _findings: &[Finding], _model_name: &str) -> Result<String, CapabilityError> {
        Err(CapabilityError::failed(self.message.clone()))
    }
}

/// Analyzer answering with a fixed report.
#[derive(Debug, Clone)]
pub struct StaticAnalyzer {
    report: AnalysisReport,
}

impl StaticAnalyzer {
    pub fn new(model_name: &str, findings: Vec<Finding>) -> Self {
        Self {
            report: AnalysisReport {
                model_name: model_name.to_string(),
                findings,
            },
        }
    }
}

#[async_trait]
impl Lifecycle for StaticAnalyzer {
    fn name(&self) -> &str {
        "static-analyzer"
    }
}

#[async_trait]
impl Analyzer for StaticAnalyzer {
    async fn analyze(&self, _image: &ImagePayload, _label: &str) -> Result<AnalysisReport, CapabilityError> {
        Ok(self.report.clone())
    }
}

/// Summarizer that sleeps before answering with a fixed text.
#[derive(Debug, Clone)]
pub struct SlowSummarizer {
    delay: Duration,
    text: String,
}

impl SlowSummarizer {
    pub fn new(delay: Duration, text: impl Into<String>) -> Self {
        Self {
            delay,
            text: text.into(),
        }
    }
}

#[async_trait]
impl Lifecycle for SlowSummarizer {
    fn name(&self) -> &str {
        "slow-summarizer"
    }
}

#[async_trait]
impl Summarizer for SlowSummarizer {
    async fn summarize(&self, _label: &str, _findings: &[Finding], _model_name: &str) -> Result<String, CapabilityError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.text.clone())
    }
}
