pub mod patterns;
pub mod statistics;

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::finding::{AgentResult, Finding};
use crate::similarity::SimilarityScorer;

use patterns::{CrossAgentPattern, PatternCandidate, PatternDetector};
use statistics::{AgentTally, MergeStatistics, TotalFindings};

/// A finding that survived cross-agent merging, carrying how many distinct
/// agent roles reported an equivalent issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedFinding {
    #[serde(flatten)]
    pub finding: Finding,

    /// Distinct agent roles in the cluster this finding represents (1 when
    /// only one agent reported it)
    #[serde(rename = "_agentConsensus")]
    pub agent_consensus: usize,
}

/// Output of one cross-agent merge pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    /// Merged findings, ranked severity-first (critical at the top), then by
    /// file and line
    pub findings: Vec<MergedFinding>,

    /// Recurring issue themes reported by multiple agent roles
    pub cross_agent_patterns: Vec<CrossAgentPattern>,

    pub statistics: MergeStatistics,
}

/// One input finding tagged with its originating agent role.
struct Tagged<'a> {
    role: &'a str,
    finding: &'a Finding,
}

/// A cluster over the flattened working set. `seed` is the first-seen member
/// and the comparison anchor during clustering; the representative shown to
/// the reviewer is chosen afterwards by confidence.
struct Cluster {
    seed: usize,
    members: Vec<usize>,
}

/// Merges the deduplicated outputs of multiple agents.
///
/// Clusters may span agent roles. Unlike intra-agent dedup, the surviving
/// text is the most confident report in the cluster, not the first seen:
/// confidence calibration differs across agents, and the most confident
/// statement is the most informative one to show.
pub struct Merger {
    scorer: SimilarityScorer,
    detector: PatternDetector,
    confidence_boost: f64,
}

impl Merger {
    pub fn new(config: &EngineConfig) -> Self {
        Merger {
            scorer: SimilarityScorer::new(config.similarity.clone()),
            detector: PatternDetector::new(config.patterns.clone()),
            confidence_boost: config.consensus.confidence_boost.max(0.0),
        }
    }

    /// Merge all agents' findings into one deduplicated, ranked list with
    /// cross-agent patterns and statistics.
    pub fn merge_results(&self, results: &[AgentResult]) -> MergeOutcome {
        let tagged: Vec<Tagged> = results
            .iter()
            .flat_map(|r| {
                r.findings.iter().map(move |f| Tagged {
                    role: r.agent_role.as_str(),
                    finding: f,
                })
            })
            .collect();

        debug!(
            agents = results.len(),
            findings = tagged.len(),
            "starting cross-agent merge"
        );

        let clusters = self.cluster(&tagged);

        let mut findings = Vec::with_capacity(clusters.len());
        let mut candidates = Vec::with_capacity(clusters.len());
        let mut retained: BTreeMap<&str, usize> = BTreeMap::new();
        let mut cross_agent_duplicates = 0;

        for cluster in &clusters {
            // Highest clamped confidence wins; ties go to the earliest input.
            let Some(rep_i) = cluster.members.iter().copied().max_by(|&x, &y| {
                tagged[x]
                    .finding
                    .clamped_confidence()
                    .partial_cmp(&tagged[y].finding.clamped_confidence())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| y.cmp(&x))
            }) else {
                continue;
            };

            let roles: BTreeSet<String> = cluster
                .members
                .iter()
                .map(|&i| tagged[i].role.to_string())
                .collect();
            let max_confidence = cluster
                .members
                .iter()
                .map(|&i| tagged[i].finding.clamped_confidence())
                .fold(0.0_f64, f64::max);
            let max_severity = cluster
                .members
                .iter()
                .map(|&i| tagged[i].finding.severity)
                .max()
                .unwrap_or(tagged[rep_i].finding.severity);

            let mut merged = tagged[rep_i].finding.clone();
            merged.severity = max_severity;
            merged.confidence = (max_confidence
                + self.confidence_boost * (roles.len() as f64 - 1.0))
                .min(1.0);

            *retained.entry(tagged[rep_i].role).or_default() += 1;
            cross_agent_duplicates += cluster
                .members
                .iter()
                .filter(|&&i| i != rep_i && tagged[i].role != tagged[rep_i].role)
                .count();

            candidates.push(PatternCandidate {
                finding: merged.clone(),
                roles: roles.clone(),
            });
            findings.push(MergedFinding {
                finding: merged,
                agent_consensus: roles.len(),
            });
        }

        // Rank for the reviewer: critical first, then by location. The sort
        // is stable, so cluster-creation order breaks any remaining ties.
        findings.sort_by(|a, b| {
            b.finding
                .severity
                .cmp(&a.finding.severity)
                .then_with(|| a.finding.file.cmp(&b.finding.file))
                .then_with(|| a.finding.line.cmp(&b.finding.line))
        });

        let cross_agent_patterns = self.detector.detect(&candidates);

        let mut by_agent: BTreeMap<String, AgentTally> = BTreeMap::new();
        for result in results {
            let entry = by_agent
                .entry(result.agent_role.clone())
                .or_insert(AgentTally {
                    original: 0,
                    retained: 0,
                    merged: 0,
                });
            entry.original += result.findings.len();
        }
        for (role, tally) in by_agent.iter_mut() {
            tally.retained = retained.get(role.as_str()).copied().unwrap_or(0);
            tally.merged = tally.original - tally.retained;
        }

        let statistics = MergeStatistics {
            total_findings: TotalFindings {
                before_merge: tagged.len(),
                after_merge: findings.len(),
                cross_agent_duplicates,
            },
            by_agent,
        };

        info!(
            before = statistics.total_findings.before_merge,
            after = statistics.total_findings.after_merge,
            patterns = cross_agent_patterns.len(),
            "cross-agent merge complete"
        );

        MergeOutcome {
            findings,
            cross_agent_patterns,
            statistics,
        }
    }

    /// Awaitable form of [`Merger::merge_results`] for callers chaining
    /// asynchronous pipeline stages. The merge itself does no async work.
    pub async fn merge_results_async(&self, results: &[AgentResult]) -> MergeOutcome {
        self.merge_results(results)
    }

    /// Greedy clustering over the flattened working set. Each finding is
    /// compared against cluster seeds only, joining the lowest-index match;
    /// the parallel scan cannot change assignment.
    fn cluster(&self, tagged: &[Tagged]) -> Vec<Cluster> {
        let mut clusters: Vec<Cluster> = Vec::new();
        for (i, t) in tagged.iter().enumerate() {
            let matched = clusters
                .par_iter()
                .enumerate()
                .filter(|(_, c)| self.scorer.is_duplicate(tagged[c.seed].finding, t.finding))
                .map(|(k, _)| k)
                .min();
            match matched {
                Some(k) => clusters[k].members.push(i),
                None => clusters.push(Cluster {
                    seed: i,
                    members: vec![i],
                }),
            }
        }
        clusters
    }
}
