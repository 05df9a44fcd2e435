use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PatternConfig;
use crate::finding::Finding;

/// A recurring issue theme independently surfaced by multiple agent roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossAgentPattern {
    /// Human-readable theme label
    pub pattern: String,

    /// Distinct agent roles that reported into this theme
    pub agents: BTreeSet<String>,

    /// The merged findings belonging to the theme
    pub findings: Vec<Finding>,

    /// Mean confidence of the member findings
    pub confidence: f64,
}

/// A merged finding together with the agent roles that contributed to it.
#[derive(Debug, Clone)]
pub struct PatternCandidate {
    pub finding: Finding,
    pub roles: BTreeSet<String>,
}

/// A known issue theme: label plus trigger substrings matched against a
/// finding's lower-cased title/category/type/description.
struct ThemePattern {
    label: &'static str,
    triggers: &'static [&'static str],
}

impl ThemePattern {
    fn matches(&self, haystack: &str) -> bool {
        self.triggers.iter().any(|t| haystack.contains(t))
    }
}

const THEMES: &[ThemePattern] = &[
    ThemePattern {
        label: "SQL injection / unsafe query construction",
        triggers: &["sql", "sqli", "query"],
    },
    ThemePattern {
        label: "Weak or deprecated cryptography",
        triggers: &["crypt", "cipher", "md5", "sha1", "digest", "hashing"],
    },
    ThemePattern {
        label: "Hardcoded secrets / credential exposure",
        triggers: &["secret", "credential", "password", "api key", "hardcoded"],
    },
    ThemePattern {
        label: "Cross-site scripting",
        triggers: &["xss", "cross-site scripting", "script injection", "unescaped"],
    },
    ThemePattern {
        label: "Path traversal",
        triggers: &["path traversal", "directory traversal", "../"],
    },
    ThemePattern {
        label: "Missing input validation",
        triggers: &["validation", "sanitiz", "untrusted input"],
    },
    ThemePattern {
        label: "Performance hotspot",
        triggers: &["n+1", "inefficien", "slow query", "memory leak", "unbounded"],
    },
    ThemePattern {
        label: "Unhandled error paths",
        triggers: &["unhandled", "panic", "unwrap", "swallowed error"],
    },
];

/// Words too generic to name a fallback pattern on their own.
const STOPWORDS: &[&str] = &[
    "with", "from", "into", "that", "this", "when", "your", "code", "file",
    "line", "issue", "found", "possible", "potential", "detected", "warning",
    "error", "risk", "vulnerability", "security",
];

/// Coarse-grained thematic recurrence detector.
///
/// Runs after exact-duplicate merging and catches findings that describe the
/// same class of problem in different words, so fell below the merge
/// threshold. Themes come first; a keyword fallback over shared significant
/// title tokens picks up anything the table does not know about.
pub struct PatternDetector {
    config: PatternConfig,
    token_re: Regex,
}

impl PatternDetector {
    pub fn new(config: PatternConfig) -> Self {
        PatternDetector {
            config,
            token_re: Regex::new(r"[a-z0-9]+").unwrap(),
        }
    }

    pub fn detect(&self, candidates: &[PatternCandidate]) -> Vec<CrossAgentPattern> {
        let mut patterns = Vec::new();
        let mut consumed = vec![false; candidates.len()];
        let haystacks: Vec<String> = candidates.iter().map(|c| haystack(&c.finding)).collect();

        for theme in THEMES {
            let hits: Vec<usize> = haystacks
                .iter()
                .enumerate()
                .filter(|(_, h)| theme.matches(h.as_str()))
                .map(|(i, _)| i)
                .collect();
            if let Some(pattern) = self.emit(theme.label, &hits, candidates) {
                for &i in &hits {
                    consumed[i] = true;
                }
                patterns.push(pattern);
            }
        }

        // Keyword fallback for findings no theme recognized: shared
        // significant title tokens, in sorted order for determinism.
        let mut by_token: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, c) in candidates.iter().enumerate() {
            if consumed[i] {
                continue;
            }
            for token in self.significant_tokens(&c.finding.title) {
                by_token.entry(token).or_default().push(i);
            }
        }
        for (token, hits) in by_token {
            let hits: Vec<usize> = hits.into_iter().filter(|&i| !consumed[i]).collect();
            if hits.len() < 2 {
                continue;
            }
            if let Some(pattern) = self.emit(&token, &hits, candidates) {
                for &i in &hits {
                    consumed[i] = true;
                }
                patterns.push(pattern);
            }
        }

        debug!(patterns = patterns.len(), "cross-agent pattern detection complete");
        patterns
    }

    /// Build a pattern from the hit set, or None when too few distinct agent
    /// roles reported into it.
    fn emit(
        &self,
        label: &str,
        hits: &[usize],
        candidates: &[PatternCandidate],
    ) -> Option<CrossAgentPattern> {
        if hits.is_empty() {
            return None;
        }
        let agents: BTreeSet<String> = hits
            .iter()
            .flat_map(|&i| candidates[i].roles.iter().cloned())
            .collect();
        if agents.len() < self.config.min_agent_roles {
            return None;
        }

        let findings: Vec<Finding> = hits.iter().map(|&i| candidates[i].finding.clone()).collect();
        let confidence =
            findings.iter().map(|f| f.clamped_confidence()).sum::<f64>() / findings.len() as f64;

        Some(CrossAgentPattern {
            pattern: label.to_string(),
            agents,
            findings,
            confidence,
        })
    }

    fn significant_tokens(&self, title: &str) -> Vec<String> {
        let lowered = title.to_lowercase();
        self.token_re
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .filter(|t| t.len() >= 4 && !STOPWORDS.contains(&t.as_str()))
            .collect()
    }
}

fn haystack(finding: &Finding) -> String {
    format!(
        "{} {} {} {}",
        finding.title, finding.category, finding.kind, finding.description
    )
    .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;

    fn candidate(title: &str, roles: &[&str], confidence: f64) -> PatternCandidate {
        PatternCandidate {
            finding: Finding {
                id: title.to_lowercase().replace(' ', "-"),
                file: Some("src/crypto.rs".into()),
                line: Some(12),
                severity: Severity::High,
                category: "security".into(),
                kind: "vulnerability".into(),
                title: title.into(),
                description: String::new(),
                confidence,
            },
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn detector() -> PatternDetector {
        PatternDetector::new(PatternConfig::default())
    }

    #[test]
    fn crypto_theme_bridges_different_wording() {
        // Different titles, same theme, two distinct roles: below the merge
        // threshold but still a pattern.
        let candidates = vec![
            candidate("Weak Encryption", &["security"], 0.9),
            candidate("Deprecated Crypto Method", &["codeQuality"], 0.7),
        ];
        let patterns = detector().detect(&candidates);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern, "Weak or deprecated cryptography");
        assert_eq!(patterns[0].agents.len(), 2);
        assert_eq!(patterns[0].findings.len(), 2);
        assert!((patterns[0].confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn single_role_theme_is_not_a_pattern() {
        let candidates = vec![
            candidate("Weak Encryption", &["security"], 0.9),
            candidate("Deprecated Crypto Method", &["security"], 0.7),
        ];
        assert!(detector().detect(&candidates).is_empty());
    }

    #[test]
    fn keyword_fallback_groups_unknown_themes() {
        let candidates = vec![
            candidate("Deadlock in connection pool", &["security"], 0.6),
            candidate("Potential deadlock on shutdown", &["performance"], 0.8),
        ];
        let patterns = detector().detect(&candidates);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern, "deadlock");
        assert_eq!(patterns[0].agents.len(), 2);
    }

    #[test]
    fn empty_input_yields_no_patterns() {
        assert!(detector().detect(&[]).is_empty());
    }

    #[test]
    fn min_roles_is_configurable() {
        let strict = PatternDetector::new(PatternConfig { min_agent_roles: 3 });
        let candidates = vec![
            candidate("Weak Encryption", &["security"], 0.9),
            candidate("Deprecated Crypto Method", &["codeQuality"], 0.7),
        ];
        assert!(strict.detect(&candidates).is_empty());
    }
}
