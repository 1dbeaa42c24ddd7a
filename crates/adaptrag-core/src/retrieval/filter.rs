//! Final relevance cutoff and truncation

use crate::rerank::ScoredCandidate;

/// Drop results below `min_relevance`, then keep at most `count`.
///
/// Ranking order from the strategy is preserved.
pub fn apply_final_filter(
    scored: Vec<ScoredCandidate>,
    min_relevance: f64,
    count: usize,
) -> Vec<ScoredCandidate> {
    let before = scored.len();
    let kept: Vec<ScoredCandidate> = scored
        .into_iter()
        .filter(|s| s.final_score >= min_relevance)
        .take(count)
        .collect();

    tracing::debug!(
        before,
        after = kept.len(),
        min_relevance,
        "Applied final filter"
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rerank::RerankStrategy;
    use crate::search::{Candidate, Chunk, SearchSurface};
    use proptest::prelude::*;

    fn scored(id: usize, score: f64) -> ScoredCandidate {
        ScoredCandidate::new(
            Candidate::new(
                Chunk::new(format!("d{}", id), "0", "text"),
                score,
                SearchSurface::Original,
            ),
            RerankStrategy::SemanticSimilarity,
            score,
        )
    }

    #[test]
    fn test_cutoff_then_truncate() {
        let input = vec![scored(0, 0.9), scored(1, 0.2), scored(2, 0.6), scored(3, 0.5)];
        let kept = apply_final_filter(input, 0.3, 2);
        let ids: Vec<&str> = kept
            .iter()
            .map(|s| s.candidate.id.document_id.as_str())
            .collect();
        assert_eq!(ids, vec!["d0", "d2"]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let kept = apply_final_filter(vec![scored(0, 0.3)], 0.3, 5);
        assert_eq!(kept.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_count(
            scores in prop::collection::vec(0.0f64..=1.0, 0..40),
            min in 0.0f64..=1.0,
            count in 0usize..12,
        ) {
            let input: Vec<ScoredCandidate> =
                scores.iter().enumerate().map(|(i, &s)| scored(i, s)).collect();
            let kept = apply_final_filter(input, min, count);
            prop_assert!(kept.len() <= count);
            prop_assert!(kept.iter().all(|s| s.final_score >= min));
        }
    }
}
