//! Pipeline topology: the fixed Detection -> Analysis -> Feedback chain.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageName {
    Detection,
    Analysis,
    Feedback,
}

impl StageName {
    /// All stages in call order.
    pub const ALL: [StageName; 3] = [StageName::Detection, StageName::Analysis, StageName::Feedback];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Detection => "Detection",
            StageName::Analysis => "Analysis",
            StageName::Feedback => "Feedback",
        }
    }

    /// The stage this one forwards to; `None` for the terminal stage.
    pub fn next(&self) -> Option<StageName> {
        match self {
            StageName::Detection => Some(StageName::Analysis),
            StageName::Analysis => Some(StageName::Feedback),
            StageName::Feedback => None,
        }
    }

    /// Key used for this stage's service settings in config-rs.
    pub fn service_key(&self) -> &'static str {
        match self {
            StageName::Detection => "DETECTION",
            StageName::Analysis => "ANALYSIS",
            StageName::Feedback => "FEEDBACK",
        }
    }

    /// Path of the stage's inbound endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            StageName::Detection => "/detect-image",
            StageName::Analysis => "/process-image",
            StageName::Feedback => "/generate-feedback",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
