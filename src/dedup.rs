use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::finding::{Finding, SimilarityGroup};
use crate::similarity::SimilarityScorer;

/// Output of one intra-agent deduplication pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupOutcome {
    /// Retained representatives, in first-seen order
    pub deduplicated: Vec<Finding>,

    /// Clusters that absorbed at least one finding
    pub similarity_groups: Vec<SimilarityGroup>,

    /// Counts over the pass
    pub statistics: DedupStats,
}

/// `total` input findings split into `unique` representatives and `similar`
/// absorbed duplicates; the three always reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupStats {
    pub total: usize,
    pub similar: usize,
    pub unique: usize,
}

/// Collapses near-duplicate findings within a single agent's output.
///
/// Greedy single-pass clustering: each finding is compared against the
/// representative of every open cluster and joins the first match, otherwise
/// opens its own cluster. First-seen wins as representative, so the output is
/// stable on input order.
pub struct Deduplicator {
    scorer: SimilarityScorer,
}

impl Deduplicator {
    pub fn new(config: &EngineConfig) -> Self {
        Deduplicator {
            scorer: SimilarityScorer::new(config.similarity.clone()),
        }
    }

    pub fn deduplicate(&self, findings: &[Finding]) -> DedupOutcome {
        let mut clusters: Vec<SimilarityGroup> = Vec::new();

        for finding in findings {
            // Compare against all open representatives in parallel; taking
            // the minimum matching index keeps the first-match rule intact
            // whatever the execution order.
            let matched = clusters
                .par_iter()
                .enumerate()
                .filter(|(_, cluster)| self.scorer.is_duplicate(&cluster.representative, finding))
                .map(|(i, _)| i)
                .min();

            match matched {
                Some(i) => clusters[i].similar.push(finding.clone()),
                None => clusters.push(SimilarityGroup {
                    representative: finding.clone(),
                    similar: Vec::new(),
                }),
            }
        }

        let deduplicated: Vec<Finding> = clusters
            .iter()
            .map(|c| c.representative.clone())
            .collect();
        let similar: usize = clusters.iter().map(|c| c.similar.len()).sum();
        let statistics = DedupStats {
            total: findings.len(),
            similar,
            unique: clusters.len(),
        };

        debug!(
            total = statistics.total,
            unique = statistics.unique,
            similar = statistics.similar,
            "intra-agent dedup pass complete"
        );

        let similarity_groups = clusters
            .into_iter()
            .filter(|c| !c.similar.is_empty())
            .collect();

        DedupOutcome {
            deduplicated,
            similarity_groups,
            statistics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;

    fn finding(id: &str, file: &str, line: u32, title: &str, description: &str) -> Finding {
        Finding {
            id: id.into(),
            file: Some(file.into()),
            line: Some(line),
            severity: Severity::High,
            category: "security".into(),
            kind: "vulnerability".into(),
            title: title.into(),
            description: description.into(),
            confidence: 0.85,
        }
    }

    fn dedup() -> Deduplicator {
        Deduplicator::new(&EngineConfig::default())
    }

    #[test]
    fn empty_input_yields_empty_zeroed_output() {
        let out = dedup().deduplicate(&[]);
        assert!(out.deduplicated.is_empty());
        assert!(out.similarity_groups.is_empty());
        assert_eq!(
            out.statistics,
            DedupStats {
                total: 0,
                similar: 0,
                unique: 0
            }
        );
    }

    #[test]
    fn single_finding_passes_through() {
        let f = finding("f1", "src/auth/login.ts", 45, "SQL Injection", "raw query");
        let out = dedup().deduplicate(std::slice::from_ref(&f));
        assert_eq!(out.deduplicated.len(), 1);
        assert_eq!(out.deduplicated[0].id, "f1");
        assert!(out.similarity_groups.is_empty());
        assert_eq!(out.statistics.unique, 1);
    }

    #[test]
    fn near_duplicates_collapse_into_one_group() {
        // Same file, two lines apart, overlapping titles.
        let a = finding(
            "f1",
            "src/auth/login.ts",
            45,
            "SQL Injection Vulnerability",
            "User input concatenated into SQL query",
        );
        let b = finding(
            "f2",
            "src/auth/login.ts",
            47,
            "SQL Injection Vulnerability in Login",
            "User input concatenated into SQL query",
        );
        let out = dedup().deduplicate(&[a, b]);
        assert_eq!(out.deduplicated.len(), 1);
        assert_eq!(out.deduplicated[0].id, "f1");
        assert_eq!(out.similarity_groups.len(), 1);
        assert_eq!(out.similarity_groups[0].similar.len(), 1);
        assert_eq!(out.similarity_groups[0].similar[0].id, "f2");
    }

    #[test]
    fn identical_titles_in_different_files_stay_separate() {
        let a = finding("f1", "src/db.rs", 10, "SQL Injection", "raw query");
        let b = finding("f2", "src/api.rs", 10, "SQL Injection", "raw query");
        let out = dedup().deduplicate(&[a, b]);
        assert_eq!(out.deduplicated.len(), 2);
        assert!(out.similarity_groups.is_empty());
    }

    #[test]
    fn all_identical_findings_collapse_to_first() {
        let f = finding("f1", "src/db.rs", 10, "Hardcoded secret", "API key in source");
        let mut batch = Vec::new();
        for i in 0..5 {
            let mut g = f.clone();
            g.id = format!("f{i}");
            batch.push(g);
        }
        let out = dedup().deduplicate(&batch);
        assert_eq!(out.deduplicated.len(), 1);
        assert_eq!(out.deduplicated[0].id, "f0");
        assert_eq!(out.similarity_groups[0].similar.len(), 4);
        assert_eq!(out.statistics.similar, 4);
    }

    #[test]
    fn conservation_of_findings() {
        let batch = vec![
            finding("f1", "a.rs", 1, "Weak hash", "md5 in use"),
            finding("f2", "a.rs", 2, "Weak hash", "md5 in use"),
            finding("f3", "b.rs", 9, "Unchecked unwrap", "panics on None"),
            finding("f4", "c.rs", 30, "Blocking call in async", "std::fs inside future"),
        ];
        let out = dedup().deduplicate(&batch);
        assert_eq!(
            out.deduplicated.len() + out.statistics.similar,
            out.statistics.total
        );
        assert_eq!(out.statistics.total, batch.len());
    }

    #[test]
    fn dedup_is_idempotent() {
        let batch = vec![
            finding("f1", "a.rs", 1, "Weak hash", "md5 in use"),
            finding("f2", "a.rs", 2, "Weak hash", "md5 in use"),
            finding("f3", "b.rs", 9, "Unchecked unwrap", "panics on None"),
        ];
        let d = dedup();
        let once = d.deduplicate(&batch);
        let twice = d.deduplicate(&once.deduplicated);
        let once_ids: Vec<&str> = once.deduplicated.iter().map(|f| f.id.as_str()).collect();
        let twice_ids: Vec<&str> = twice.deduplicated.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(once_ids, twice_ids);
        assert_eq!(twice.statistics.similar, 0);
    }

    #[test]
    fn malformed_findings_become_singletons() {
        let mut a = finding("f1", "a.rs", 1, "Weak hash", "md5 in use");
        a.file = None;
        let mut b = finding("f2", "a.rs", 1, "Weak hash", "md5 in use");
        b.file = None;
        let out = dedup().deduplicate(&[a, b]);
        // Without a location anchor nothing can be merged, but nothing is
        // dropped either.
        assert_eq!(out.deduplicated.len(), 2);
        assert!(out.similarity_groups.is_empty());
    }
}
