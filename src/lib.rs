//! Crosscheck — cross-agent finding deduplication and merge engine.
//!
//! A multi-agent code-review pipeline runs several independent analyzers
//! (security, code quality, performance, ...) over the same change and ends
//! up with overlapping reports of the same issues. Crosscheck turns those
//! per-agent finding lists into a single non-redundant, ranked list:
//!
//! - [`Deduplicator`] collapses near-duplicates within one agent's output.
//! - [`Merger`] merges duplicates across agents, aggregating severity,
//!   confidence, and consensus, and surfaces recurring cross-agent themes.
//!
//! Both passes are pure, deterministic transformations over in-memory lists:
//! no I/O, no state between calls, safe to run concurrently for independent
//! requests. Similarity is lexical (token overlap plus line proximity), never
//! embedding-based, so results are reproducible and auditable.
//!
//! ```
//! use crosscheck::{deduplicate_findings, merge_results, Finding, Severity};
//!
//! let findings = vec![Finding {
//!     id: "sec-1".into(),
//!     file: Some("src/auth/login.ts".into()),
//!     line: Some(45),
//!     severity: Severity::High,
//!     category: "security".into(),
//!     kind: "vulnerability".into(),
//!     title: "SQL Injection Vulnerability".into(),
//!     description: "User input concatenated into SQL query".into(),
//!     confidence: 0.9,
//! }];
//! let outcome = deduplicate_findings(&findings);
//! assert_eq!(outcome.deduplicated.len(), 1);
//! assert_eq!(merge_results(&[]).findings.len(), 0);
//! ```

pub mod config;
pub mod dedup;
pub mod finding;
pub mod merge;
pub mod report;
pub mod similarity;

pub use config::{ConfigError, EngineConfig};
pub use dedup::{DedupOutcome, DedupStats, Deduplicator};
pub use finding::{AgentResult, Finding, Severity, SimilarityGroup};
pub use merge::patterns::CrossAgentPattern;
pub use merge::statistics::{AgentTally, MergeStatistics, TotalFindings};
pub use merge::{MergeOutcome, MergedFinding, Merger};
pub use similarity::SimilarityScorer;

/// Deduplicate one agent's raw findings with the default configuration.
pub fn deduplicate_findings(findings: &[Finding]) -> DedupOutcome {
    Deduplicator::new(&EngineConfig::default()).deduplicate(findings)
}

/// Merge all agents' results with the default configuration.
pub fn merge_results(results: &[AgentResult]) -> MergeOutcome {
    Merger::new(&EngineConfig::default()).merge_results(results)
}
