//! # Stage Result Envelope
//!
//! The accumulating result threaded through the chain. Each stage records
//! its own contribution once; merging a downstream envelope only fills slots
//! that are still empty, so a value set by its owning stage is never
//! overwritten on the way back up.
//!
//! Faults are kept deepest first. `downstream_error` always mirrors the
//! first entry of `faults`.

use error_handling_rs::ErrorInfo;
use serde::{Deserialize, Serialize};

use crate::findings::Finding;
use crate::stage::StageName;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionContribution {
    pub image_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContribution {
    pub model_used: String,
    pub analysis_result: String,
    #[serde(default)]
    pub findings: Vec<Finding>,
}

/// The terminal stage's full answer, echoed inputs included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackContribution {
    pub image_type: String,
    pub analysis_result: String,
    pub model_used: String,
    pub feedback: String,
}

/// Per-stage contributions keyed by stage name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageContributions {
    #[serde(rename = "Detection", default, skip_serializing_if = "Option::is_none")]
    detection: Option<DetectionContribution>,
    #[serde(rename = "Analysis", default, skip_serializing_if = "Option::is_none")]
    analysis: Option<AnalysisContribution>,
    #[serde(rename = "Feedback", default, skip_serializing_if = "Option::is_none")]
    feedback: Option<FeedbackContribution>,
}

impl StageContributions {
    pub fn detection(&self) -> Option<&DetectionContribution> {
        self.detection.as_ref()
    }

    pub fn analysis(&self) -> Option<&AnalysisContribution> {
        self.analysis.as_ref()
    }

    pub fn feedback(&self) -> Option<&FeedbackContribution> {
        self.feedback.as_ref()
    }

    pub fn contains(&self, stage: StageName) -> bool {
        match stage {
            StageName::Detection => self.detection.is_some(),
            StageName::Analysis => self.analysis.is_some(),
            StageName::Feedback => self.feedback.is_some(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analysis_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    findings: Option<Vec<Finding>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feedback: Option<String>,
    #[serde(default)]
    stages: StageContributions,
    #[serde(default)]
    downstream_error: Option<ErrorInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    faults: Vec<ErrorInfo>,
}

// First writer wins.
fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

impl Envelope {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..Self::default()
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn image_type(&self) -> Option<&str> {
        self.image_type.as_deref()
    }

    pub fn model_used(&self) -> Option<&str> {
        self.model_used.as_deref()
    }

    pub fn analysis_result(&self) -> Option<&str> {
        self.analysis_result.as_deref()
    }

    pub fn findings(&self) -> Option<&[Finding]> {
        self.findings.as_deref()
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn stages(&self) -> &StageContributions {
        &self.stages
    }

    pub fn downstream_error(&self) -> Option<&ErrorInfo> {
        self.downstream_error.as_ref()
    }

    pub fn faults(&self) -> &[ErrorInfo] {
        &self.faults
    }

    /// Stages whose contribution is present, in call order.
    pub fn reached_stages(&self) -> Vec<StageName> {
        StageName::ALL
            .into_iter()
            .filter(|stage| self.stages.contains(*stage))
            .collect()
    }

    pub fn record_detection(&mut self, contribution: DetectionContribution) {
        fill(&mut self.image_type, Some(contribution.image_type.clone()));
        fill(&mut self.stages.detection, Some(contribution));
    }

    pub fn record_analysis(&mut self, contribution: AnalysisContribution) {
        fill(&mut self.model_used, Some(contribution.model_used.clone()));
        fill(&mut self.analysis_result, Some(contribution.analysis_result.clone()));
        fill(&mut self.findings, Some(contribution.findings.clone()));
        fill(&mut self.stages.analysis, Some(contribution));
    }

    pub fn record_feedback(&mut self, contribution: FeedbackContribution) {
        fill(&mut self.feedback, Some(contribution.feedback.clone()));
        fill(&mut self.stages.feedback, Some(contribution));
    }

    /// Record a fault raised by this stage itself (its capability). Any fault
    /// already present came from deeper in the chain and stays in front.
    pub fn record_fault(&mut self, fault: ErrorInfo) {
        self.faults.push(fault);
        self.sync_downstream_error();
    }

    /// Record a failed hop to the next stage. It is deeper than anything this
    /// stage recorded itself.
    pub fn record_hop_fault(&mut self, fault: ErrorInfo) {
        self.faults.insert(0, fault);
        self.sync_downstream_error();
    }

    /// Merge the envelope returned by the next stage. Slots this envelope
    /// already holds are kept; the downstream faults go in front of ours.
    pub fn absorb(&mut self, downstream: Envelope) {
        let Envelope {
            request_id,
            image_type,
            model_used,
            analysis_result,
            findings,
            feedback,
            stages,
            downstream_error,
            faults,
        } = downstream;

        fill(&mut self.request_id, request_id);
        fill(&mut self.image_type, image_type);
        fill(&mut self.model_used, model_used);
        fill(&mut self.analysis_result, analysis_result);
        fill(&mut self.findings, findings);
        fill(&mut self.feedback, feedback);
        fill(&mut self.stages.detection, stages.detection);
        fill(&mut self.stages.analysis, stages.analysis);
        fill(&mut self.stages.feedback, stages.feedback);

        // A peer may send only downstream_error without the full trail.
        let mut deeper = faults;
        if deeper.is_empty() {
            deeper.extend(downstream_error);
        }
        deeper.append(&mut self.faults);
        self.faults = deeper;
        self.sync_downstream_error();
    }

    fn sync_downstream_error(&mut self) {
        self.downstream_error = self.faults.first().cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use error_handling_rs::ErrorKind;

    fn analysis(result: &str) -> AnalysisContribution {
        AnalysisContribution {
            model_used: "DiagnosticModel".to_string(),
            analysis_result: result.to_string(),
            findings: vec![Finding::new("FindingA", 0.8)],
        }
    }

    #[test]
    fn test_recorded_values_are_never_overwritten() {
        let mut envelope = Envelope::new("req-1");
        envelope.record_detection(DetectionContribution {
            image_type: "X-ray".to_string(),
        });
        envelope.record_detection(DetectionContribution {
            image_type: "MRI".to_string(),
        });

        assert_eq!(envelope.image_type(), Some("X-ray"));
        assert_eq!(envelope.stages().detection().unwrap().image_type, "X-ray");
    }

    #[test]
    fn test_absorb_fills_only_empty_slots() {
        let mut upstream = Envelope::new("req-1");
        upstream.record_detection(DetectionContribution {
            image_type: "X-ray".to_string(),
        });

        let mut downstream = Envelope::new("req-other");
        downstream.record_detection(DetectionContribution {
            image_type: "CT".to_string(),
        });
        downstream.record_analysis(analysis("FindingA (0.8)"));

        upstream.absorb(downstream);

        assert_eq!(upstream.request_id(), Some("req-1"));
        assert_eq!(upstream.image_type(), Some("X-ray"));
        assert_eq!(upstream.stages().detection().unwrap().image_type, "X-ray");
        assert_eq!(upstream.analysis_result(), Some("FindingA (0.8)"));
        assert_eq!(upstream.model_used(), Some("DiagnosticModel"));
        assert_eq!(upstream.findings().unwrap().len(), 1);
        assert_eq!(
            upstream.reached_stages(),
            vec![StageName::Detection, StageName::Analysis]
        );
    }

    #[test]
    fn test_deepest_fault_wins() {
        // Analysis: own capability failed, then the hop to Feedback timed out
        let mut analysis_env = Envelope::default();
        analysis_env.record_fault(ErrorInfo::capability_failure("weights missing", "Analysis"));
        analysis_env.record_hop_fault(ErrorInfo::timeout("no answer", "Feedback"));

        assert_eq!(analysis_env.downstream_error().unwrap().origin_stage, "Feedback");

        // Detection: own capability failed too, then absorbs Analysis' answer
        let mut detection_env = Envelope::new("req-1");
        detection_env.record_fault(ErrorInfo::capability_failure("classifier down", "Detection"));
        detection_env.absorb(analysis_env);

        let origins: Vec<&str> = detection_env
            .faults()
            .iter()
            .map(|f| f.origin_stage.as_str())
            .collect();
        assert_eq!(origins, vec!["Feedback", "Analysis", "Detection"]);
        assert_eq!(detection_env.downstream_error().unwrap().kind, ErrorKind::Timeout);
    }

    #[test]
    fn test_absorb_accepts_bare_downstream_error() {
        let downstream: Envelope = serde_json::from_value(serde_json::json!({
            "downstream_error": {
                "kind": "BadStatus",
                "detail": "status 503",
                "origin_stage": "Feedback"
            }
        }))
        .unwrap();

        let mut envelope = Envelope::new("req-1");
        envelope.absorb(downstream);

        assert_eq!(envelope.faults().len(), 1);
        assert_eq!(envelope.downstream_error().unwrap().kind, ErrorKind::BadStatus);
    }

    #[test]
    fn test_wire_shape() {
        let mut envelope = Envelope::new("req-1");
        envelope.record_detection(DetectionContribution {
            image_type: "X-ray".to_string(),
        });
        envelope.record_analysis(analysis("FindingA (0.8)"));
        envelope.record_feedback(FeedbackContribution {
            image_type: "X-ray".to_string(),
            analysis_result: "FindingA (0.8)".to_string(),
            model_used: "DiagnosticModel".to_string(),
            feedback: "All clear".to_string(),
        });

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["image_type"], "X-ray");
        assert_eq!(json["feedback"], "All clear");
        assert_eq!(json["stages"]["Analysis"]["model_used"], "DiagnosticModel");
        assert_eq!(json["stages"]["Feedback"]["feedback"], "All clear");
        assert!(json["downstream_error"].is_null());
        assert!(json.get("faults").is_none());
    }
}
