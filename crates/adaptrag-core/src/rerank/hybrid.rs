//! Hybrid combiner blending cross-encoder, MMR and similarity scores

use super::{
    mmr_select, rescore_with_similarity, sort_by_final_score, CrossEncoderStrategy,
    HybridWeights, RerankStrategy, ScoredCandidate,
};
use crate::error::{Stage, StageDegradation};
use crate::search::{clamp_unit, Candidate, ChunkId};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs the component strategies concurrently and blends their scores
pub struct HybridCombiner {
    cross_encoder: CrossEncoderStrategy,
    diversity_weight: f64,
    weights: HybridWeights,
}

impl HybridCombiner {
    pub fn new(
        cross_encoder: CrossEncoderStrategy,
        diversity_weight: f64,
        weights: HybridWeights,
    ) -> Self {
        Self {
            cross_encoder,
            diversity_weight,
            weights,
        }
    }

    /// Score every candidate with the normalized weighted sum of the
    /// component scores.
    ///
    /// A component that fails or skips a candidate contributes 0 for it.
    /// Output covers every input candidate, ordered by descending combined
    /// score (stable).
    pub async fn combine(
        &self,
        query: &str,
        candidates: &[Candidate],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> (Vec<ScoredCandidate>, Vec<StageDegradation>) {
        let mut degradations = Vec::new();

        let (cohere, mmr, semantic) = tokio::join!(
            self.cross_encoder.rerank(query, candidates, timeout, cancel),
            async { mmr_select(candidates, self.diversity_weight) },
            async { rescore_with_similarity(candidates, RerankStrategy::SemanticSimilarity) },
        );

        let cohere_scores = match cohere {
            Ok(scored) => score_map(&scored),
            Err(reason) => {
                tracing::warn!("Hybrid cross-encoder component degraded: {}", reason);
                degradations.push(StageDegradation::new(Stage::Rerank, reason));
                HashMap::new()
            }
        };
        let mmr_scores = score_map(&mmr);
        let semantic_scores = score_map(&semantic);

        let total = self.weights.total();
        let components = [
            (RerankStrategy::Cohere, self.weights.cohere, &cohere_scores),
            (RerankStrategy::Mmr, self.weights.mmr, &mmr_scores),
            (
                RerankStrategy::SemanticSimilarity,
                self.weights.semantic,
                &semantic_scores,
            ),
        ];

        let mut combined: Vec<ScoredCandidate> = candidates
            .iter()
            .map(|candidate| {
                let mut weighted = 0.0;
                let mut scored =
                    ScoredCandidate::new(candidate.clone(), RerankStrategy::Hybrid, 0.0);
                for (strategy, weight, scores) in &components {
                    if let Some(&score) = scores.get(&candidate.id) {
                        scored.scores.insert(*strategy, score);
                        weighted += weight * score;
                    }
                }
                let final_score = if total > 0.0 {
                    clamp_unit(weighted / total)
                } else {
                    0.0
                };
                scored.scores.insert(RerankStrategy::Hybrid, final_score);
                scored.final_score = final_score;
                scored
            })
            .collect();
        sort_by_final_score(&mut combined);

        tracing::debug!(
            candidates = combined.len(),
            cohere_scored = cohere_scores.len(),
            mmr_scored = mmr_scores.len(),
            "Hybrid combination complete"
        );

        (combined, degradations)
    }
}

fn score_map(scored: &[ScoredCandidate]) -> HashMap<ChunkId, f64> {
    scored
        .iter()
        .map(|s| (s.candidate.id.clone(), s.final_score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AdaptragError, DegradedReason, Result};
    use crate::llm::{RerankHit, Reranker};
    use crate::search::{Chunk, SearchSurface};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedReranker(Vec<f64>);

    #[async_trait]
    impl Reranker for FixedReranker {
        async fn rerank(&self, _: &str, documents: &[String], _: usize) -> Result<Vec<RerankHit>> {
            Ok(self
                .0
                .iter()
                .take(documents.len())
                .enumerate()
                .map(|(index, &relevance_score)| RerankHit {
                    index,
                    relevance_score,
                })
                .collect())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingReranker;

    #[async_trait]
    impl Reranker for FailingReranker {
        async fn rerank(&self, _: &str, _: &[String], _: usize) -> Result<Vec<RerankHit>> {
            Err(AdaptragError::MissingCredentials("rerank service".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::new(
                Chunk::new("a", "0", "alpha apples orchard"),
                0.9,
                SearchSurface::Original,
            ),
            Candidate::new(
                Chunk::new("b", "0", "beta bananas plantation"),
                0.5,
                SearchSurface::Rewritten,
            ),
            Candidate::new(
                Chunk::new("c", "0", "gamma grapes vineyard"),
                0.4,
                SearchSurface::Hyde,
            ),
        ]
    }

    fn combiner(reranker: Arc<dyn Reranker>) -> HybridCombiner {
        HybridCombiner::new(
            CrossEncoderStrategy::new(Some(reranker), 50, 800),
            0.3,
            HybridWeights::default(),
        )
    }

    #[tokio::test]
    async fn test_cross_encoder_dominates_blend() {
        let combiner = combiner(Arc::new(FixedReranker(vec![0.1, 0.2, 1.0])));
        let (scored, degradations) = combiner
            .combine("q", &candidates(), Duration::from_secs(1), &CancellationToken::new())
            .await;

        assert!(degradations.is_empty());
        assert_eq!(scored.len(), 3);
        assert_eq!(scored[0].candidate.id.document_id, "c");
        for s in &scored {
            assert!((0.0..=1.0).contains(&s.final_score));
            assert_eq!(s.score(RerankStrategy::Hybrid), Some(s.final_score));
            assert!(s.score(RerankStrategy::Cohere).is_some());
            assert!(s.score(RerankStrategy::SemanticSimilarity).is_some());
        }
    }

    #[tokio::test]
    async fn test_weighted_sum_is_normalized() {
        let combiner = combiner(Arc::new(FixedReranker(vec![1.0, 1.0, 1.0])));
        let (scored, _) = combiner
            .combine("q", &candidates(), Duration::from_secs(1), &CancellationToken::new())
            .await;
        let top = &scored[0];
        let expected = (0.4 * top.score(RerankStrategy::Cohere).unwrap()
            + 0.2 * top.score(RerankStrategy::Mmr).unwrap_or(0.0)
            + 0.1 * top.score(RerankStrategy::SemanticSimilarity).unwrap())
            / 0.7;
        assert!((top.final_score - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_component_contributes_zero() {
        let combiner = combiner(Arc::new(FailingReranker));
        let (scored, degradations) = combiner
            .combine("q", &candidates(), Duration::from_secs(1), &CancellationToken::new())
            .await;

        assert_eq!(degradations.len(), 1);
        assert!(matches!(
            degradations[0].reason,
            DegradedReason::MissingCredentials(_)
        ));
        assert_eq!(scored.len(), 3);
        assert!(scored.iter().all(|s| s.score(RerankStrategy::Cohere).is_none()));
        assert!(scored[0].final_score < 0.5);
    }
}
