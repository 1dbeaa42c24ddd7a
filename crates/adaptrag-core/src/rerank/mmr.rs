//! Maximal Marginal Relevance diversity selection

use super::{RerankStrategy, ScoredCandidate};
use crate::search::text::{jaccard, token_set};
use crate::search::{clamp_unit, Candidate};
use std::collections::HashSet;

/// Below this many candidates MMR passes input through unchanged
const MIN_MMR_CANDIDATES: usize = 3;

/// Greedy MMR over lexical similarity.
///
/// Seeds with the most relevant candidate, then repeatedly picks the
/// candidate maximizing `λ·relevance + (1−λ)·(1 − maxSimilarityToSelected)`.
/// Output is in selection order with the marginal score as the MMR score.
/// Stops early when no remaining candidate has a positive marginal score.
pub fn mmr_select(candidates: &[Candidate], lambda: f64) -> Vec<ScoredCandidate> {
    if candidates.len() < MIN_MMR_CANDIDATES {
        return candidates
            .iter()
            .map(|c| ScoredCandidate::new(c.clone(), RerankStrategy::Mmr, c.similarity))
            .collect();
    }

    let lambda = clamp_unit(lambda);
    let token_sets: Vec<HashSet<String>> =
        candidates.iter().map(|c| token_set(c.content())).collect();

    // Ties resolve to the earlier candidate
    let seed = candidates
        .iter()
        .enumerate()
        .fold(0, |best, (idx, c)| {
            if c.similarity > candidates[best].similarity {
                idx
            } else {
                best
            }
        });

    let mut scored = vec![ScoredCandidate::new(
        candidates[seed].clone(),
        RerankStrategy::Mmr,
        lambda * candidates[seed].similarity + (1.0 - lambda),
    )];
    // Running max similarity of each candidate to the selected set
    let mut max_similarity: Vec<f64> = token_sets
        .iter()
        .map(|set| jaccard(set, &token_sets[seed]))
        .collect();
    let mut remaining: Vec<usize> = (0..candidates.len()).filter(|&i| i != seed).collect();

    while !remaining.is_empty() {
        let mut best: Option<(usize, f64)> = None;
        for (pos, &idx) in remaining.iter().enumerate() {
            let score = lambda * candidates[idx].similarity
                + (1.0 - lambda) * (1.0 - max_similarity[idx]);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((pos, score));
            }
        }

        let Some((pos, score)) = best else { break };
        if score <= 0.0 {
            tracing::debug!(
                dropped = remaining.len(),
                "MMR stopped: no remaining candidate improves the selection"
            );
            break;
        }

        let idx = remaining.remove(pos);
        for (other, sim) in max_similarity.iter_mut().enumerate() {
            let s = jaccard(&token_sets[other], &token_sets[idx]);
            if s > *sim {
                *sim = s;
            }
        }
        scored.push(ScoredCandidate::new(
            candidates[idx].clone(),
            RerankStrategy::Mmr,
            score,
        ));
    }

    scored
}
