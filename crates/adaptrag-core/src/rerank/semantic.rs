//! Semantic-similarity passthrough

use super::{sort_by_final_score, RerankStrategy, ScoredCandidate};
use crate::search::Candidate;

/// Score each candidate with its base similarity, keeping input order
pub fn rescore_with_similarity(
    candidates: &[Candidate],
    strategy: RerankStrategy,
) -> Vec<ScoredCandidate> {
    candidates
        .iter()
        .map(|c| ScoredCandidate::new(c.clone(), strategy, c.similarity))
        .collect()
}

/// Rank candidates by their existing similarity (stable on ties)
pub fn semantic_passthrough(candidates: &[Candidate]) -> Vec<ScoredCandidate> {
    let mut scored = rescore_with_similarity(candidates, RerankStrategy::SemanticSimilarity);
    sort_by_final_score(&mut scored);
    scored
}
