//! # Pipeline Fault Types
//!
//! Faults are carried between stages as data rather than raised. `ErrorInfo`
//! is the serialized record of one fault: what went wrong, and at which
//! stage.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Categorizes faults observed along the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The next stage could not be reached (connection refused, DNS failure)
    Unreachable,
    /// The next stage did not answer within the hop timeout
    Timeout,
    /// The next stage answered with a non-success status code
    BadStatus,
    /// A payload (inbound request or downstream response) was malformed
    BadPayload,
    /// The stage's own capability provider failed
    CapabilityFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Unreachable => write!(f, "Unreachable"),
            ErrorKind::Timeout => write!(f, "Timeout"),
            ErrorKind::BadStatus => write!(f, "BadStatus"),
            ErrorKind::BadPayload => write!(f, "BadPayload"),
            ErrorKind::CapabilityFailure => write!(f, "CapabilityFailure"),
        }
    }
}

/// One attributable fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} at {origin_stage}: {detail}")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub detail: String,
    /// Name of the stage the fault is attributed to. For hop faults this is
    /// the stage that was called, not the caller.
    pub origin_stage: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, detail: impl Into<String>, origin_stage: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            origin_stage: origin_stage.into(),
        }
    }

    pub fn unreachable(detail: impl Into<String>, origin_stage: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unreachable, detail, origin_stage)
    }

    pub fn timeout(detail: impl Into<String>, origin_stage: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, detail, origin_stage)
    }

    pub fn bad_status(detail: impl Into<String>, origin_stage: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadStatus, detail, origin_stage)
    }

    pub fn capability_failure(detail: impl Into<String>, origin_stage: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapabilityFailure, detail, origin_stage)
    }

    /// Emit this fault as a structured warning.
    pub fn log(&self) {
        tracing::warn!(
            kind = %self.kind,
            origin_stage = %self.origin_stage,
            detail = %self.detail,
            "Pipeline fault recorded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_display() {
        let err = ErrorInfo::timeout("no answer within 15s", "Analysis");
        assert_eq!(err.to_string(), "Timeout at Analysis: no answer within 15s");
    }

    #[test]
    fn test_error_info_wire_shape() {
        let err = ErrorInfo::capability_failure("model not loaded", "Analysis");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["kind"], "CapabilityFailure");
        assert_eq!(json["detail"], "model not loaded");
        assert_eq!(json["origin_stage"], "Analysis");

        let back: ErrorInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }
}
