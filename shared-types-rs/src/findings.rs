//! Structured analysis findings and their text rendering.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Rendering used when an analysis produced no findings.
pub const NO_FINDINGS: &str = "No findings reported";

// `Name (0.8)`; names may contain spaces but not parentheses or commas
static FINDING_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*([^,()]+?)\s*\(\s*([0-9]*\.?[0-9]+)\s*\)").expect("finding pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub name: String,
    pub confidence: f64,
}

impl Finding {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// Render findings as `"FindingA (0.8), FindingB (0.2)"`.
pub fn render_findings(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return NO_FINDINGS.to_string();
    }
    findings
        .iter()
        .map(|f| format!("{} ({})", f.name, f.confidence))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lenient inverse of [`render_findings`] for peers that only send text.
/// Fragments that do not look like `Name (confidence)` are skipped.
pub fn parse_findings(text: &str) -> Vec<Finding> {
    FINDING_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().trim();
            let confidence = caps.get(2)?.as_str().parse::<f64>().ok()?;
            if name.is_empty() {
                return None;
            }
            Some(Finding::new(name, confidence))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_findings() {
        let findings = vec![Finding::new("FindingA", 0.8), Finding::new("FindingB", 0.2)];
        assert_eq!(render_findings(&findings), "FindingA (0.8), FindingB (0.2)");
        assert_eq!(render_findings(&[]), NO_FINDINGS);
    }

    #[test]
    fn test_parse_findings_text() {
        let parsed = parse_findings("FindingA (0.8), Pleural effusion (0.25)");
        assert_eq!(
            parsed,
            vec![Finding::new("FindingA", 0.8), Finding::new("Pleural effusion", 0.25)]
        );
    }

    #[test]
    fn test_parse_findings_skips_free_text() {
        assert!(parse_findings("TBD").is_empty());
        assert_eq!(parse_findings("noise, Nodule (.9)"), vec![Finding::new("Nodule", 0.9)]);
    }
}
