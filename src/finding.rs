use serde::{Deserialize, Serialize};

/// Severity level of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            _ => Severity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single finding reported by one analyzer agent.
///
/// `file` and `line` are optional: agents occasionally emit findings without
/// a usable anchor location, and those must flow through the engine unmerged
/// rather than be rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Opaque identifier, unique within the originating agent's output
    pub id: String,

    /// Source file path the finding anchors to
    #[serde(default)]
    pub file: Option<String>,

    /// 1-based anchor line
    #[serde(default)]
    pub line: Option<u32>,

    /// Severity level
    pub severity: Severity,

    /// Free-form classification, e.g. "security", "code-quality"
    #[serde(default)]
    pub category: String,

    /// Free-form subtype, e.g. "vulnerability", "issue"
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Short title
    pub title: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// The originating agent's self-reported certainty, in [0, 1]
    pub confidence: f64,
}

impl Finding {
    /// Confidence coerced into [0, 1]; agents are not trusted to stay in range.
    pub fn clamped_confidence(&self) -> f64 {
        if self.confidence.is_nan() {
            return 0.0;
        }
        self.confidence.clamp(0.0, 1.0)
    }

    /// Whether the finding carries a usable anchor location.
    pub fn has_location(&self) -> bool {
        self.file.is_some() && self.line.is_some()
    }
}

/// One analyzer invocation's deduplicated output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    /// Specific run/instance identifier
    pub agent_id: String,

    /// Semantic lens: "security", "performance", "codeQuality", ...
    pub agent_role: String,

    /// Findings from this invocation
    pub findings: Vec<Finding>,
}

/// A cluster of near-duplicates: `representative` is retained, `similar`
/// were folded into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityGroup {
    pub representative: Finding,
    pub similar: Vec<Finding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_round_trips_through_str() {
        for s in [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            assert_eq!(Severity::from_str(s.as_str()), s);
        }
    }

    #[test]
    fn confidence_is_clamped() {
        let mut f = Finding {
            id: "f1".into(),
            file: Some("a.rs".into()),
            line: Some(1),
            severity: Severity::Low,
            category: String::new(),
            kind: String::new(),
            title: "t".into(),
            description: String::new(),
            confidence: 1.7,
        };
        assert_eq!(f.clamped_confidence(), 1.0);
        f.confidence = -0.2;
        assert_eq!(f.clamped_confidence(), 0.0);
        f.confidence = f64::NAN;
        assert_eq!(f.clamped_confidence(), 0.0);
    }

    #[test]
    fn finding_serializes_with_wire_names() {
        let f = Finding {
            id: "sec-1".into(),
            file: Some("src/auth/login.ts".into()),
            line: Some(45),
            severity: Severity::High,
            category: "security".into(),
            kind: "vulnerability".into(),
            title: "SQL Injection Vulnerability".into(),
            description: "d".into(),
            confidence: 0.9,
        };
        let v: serde_json::Value = serde_json::to_value(&f).unwrap();
        assert_eq!(v["severity"], "high");
        assert_eq!(v["type"], "vulnerability");
        assert_eq!(v["file"], "src/auth/login.ts");
    }
}
