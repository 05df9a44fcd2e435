use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Aggregate counts over one cross-agent merge pass.
///
/// Field names are part of the wire contract: the report generator
/// destructures `statistics.totalFindings.beforeMerge` and
/// `statistics.byAgent[role]` directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStatistics {
    pub total_findings: TotalFindings,

    /// Per agent-role tallies, keyed by role for stable serialization
    pub by_agent: BTreeMap<String, AgentTally>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalFindings {
    /// Sum of all input findings across all agents
    pub before_merge: usize,

    /// Findings surviving as merged representatives
    pub after_merge: usize,

    /// Findings absorbed into a representative from a different agent role;
    /// same-role absorptions are intra-agent removals and not counted here
    pub cross_agent_duplicates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTally {
    /// Findings this role contributed before merging
    pub original: usize,

    /// Of those, how many survived as representatives
    pub retained: usize,

    /// original - retained
    pub merged: usize,
}
