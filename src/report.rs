use crate::merge::MergeOutcome;

/// Render a merge outcome as pretty-printed JSON.
///
/// The field names are the wire contract: downstream report generators
/// destructure `statistics.totalFindings.beforeMerge`,
/// `byAgent[role].{original,retained,merged}`, `_agentConsensus`, and
/// `crossAgentPatterns[i].{pattern,agents,findings,confidence}` directly.
pub fn render(outcome: &MergeOutcome) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(outcome)
}
