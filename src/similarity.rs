use std::collections::HashSet;

use crate::config::SimilarityConfig;
use crate::finding::Finding;

/// Pairwise similarity scorer over findings.
///
/// Scores are symmetric, reflexive, and lexical only: token-set overlap plus
/// line proximity, never embeddings. Findings stay auditable because the same
/// inputs always produce the same score.
pub struct SimilarityScorer {
    config: SimilarityConfig,
}

impl SimilarityScorer {
    pub fn new(config: SimilarityConfig) -> Self {
        SimilarityScorer { config }
    }

    /// Similarity between two findings in [0, 1].
    ///
    /// Findings in different files, or without a usable file/line anchor,
    /// score 0 and can never merge. Within the same file, the text composite
    /// is lifted by line proximity: nearby lines push moderately similar text
    /// over the duplicate threshold, while findings far apart must stand on
    /// text similarity alone.
    pub fn score(&self, a: &Finding, b: &Finding) -> f64 {
        let (Some(file_a), Some(file_b)) = (a.file.as_deref(), b.file.as_deref()) else {
            return 0.0;
        };
        if file_a != file_b {
            return 0.0;
        }
        let (Some(line_a), Some(line_b)) = (a.line, b.line) else {
            return 0.0;
        };

        let text = self.text_similarity(a, b);

        let distance = line_a.abs_diff(line_b) as f64;
        let window = self.config.line_proximity as f64 + 1.0;
        let proximity = (1.0 - distance / window).max(0.0);
        let blend = self.config.proximity_weight.clamp(0.0, 1.0);

        (text + (1.0 - text) * blend * proximity).clamp(0.0, 1.0)
    }

    /// Whether two findings are close enough to be the same issue.
    pub fn is_duplicate(&self, a: &Finding, b: &Finding) -> bool {
        self.score(a, b) >= self.config.threshold
    }

    /// Weighted title/description composite. Weights are normalized so a
    /// misconfigured pair that does not sum to 1 cannot push the composite
    /// out of [0, 1].
    fn text_similarity(&self, a: &Finding, b: &Finding) -> f64 {
        let tw = self.config.title_weight.max(0.0);
        let dw = self.config.description_weight.max(0.0);
        let sum = tw + dw;
        let (tw, dw) = if sum > 0.0 {
            (tw / sum, dw / sum)
        } else {
            (0.5, 0.5)
        };

        tw * jaccard(&a.title, &b.title) + dw * jaccard(&a.description, &b.description)
    }
}

/// Token-set Jaccard similarity over lower-cased, whitespace-split text.
///
/// Identical normalized strings short-circuit to exactly 1.0, which also
/// covers the two-empty-strings case without dividing by zero.
fn jaccard(a: &str, b: &str) -> f64 {
    let a_norm = a.trim().to_lowercase();
    let b_norm = b.trim().to_lowercase();
    if a_norm == b_norm {
        return 1.0;
    }

    let a_tokens: HashSet<&str> = a_norm.split_whitespace().collect();
    let b_tokens: HashSet<&str> = b_norm.split_whitespace().collect();
    let union = a_tokens.union(&b_tokens).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a_tokens.intersection(&b_tokens).count();

    intersection as f64 / union as f64
}
