//! Request orchestration: expansion → fan-out → dedup → rerank → filter

use super::{apply_final_filter, QualityMetrics, RetrievalOptions, RetrievalResult};
use crate::error::{DegradedReason, Stage, StageDegradation};
use crate::llm::{ExpansionRequest, QueryExpansionGenerator, Reranker, StructuredGenerator};
use crate::query::Query;
use crate::rerank::{
    default_strategy_configs, mmr_select, select, semantic_passthrough, CrossEncoderStrategy,
    HybridCombiner, HybridWeights, RerankStrategy, RerankStrategyConfig, ScoredCandidate,
    StrategyParams,
};
use crate::search::{
    deduplicate, fan_out_search, per_surface_budget, Candidate, SearchIndex, SurfaceQuery,
    UserScope,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

const DEFAULT_MAX_DOCUMENTS: usize = 50;
const DEFAULT_MAX_DOCUMENT_CHARS: usize = 800;
const DEFAULT_DIVERSITY_WEIGHT: f64 = 0.3;

/// Multi-strategy adaptive retriever.
///
/// Collaborators are injected; all per-request state lives on the stack of
/// [`AdaptiveRetriever::retrieve_with_cancel`], so one retriever may serve
/// concurrent requests.
pub struct AdaptiveRetriever {
    index: Arc<dyn SearchIndex>,
    expander: Option<QueryExpansionGenerator>,
    reranker: Option<Arc<dyn Reranker>>,
    strategy_configs: Vec<RerankStrategyConfig>,
}

impl AdaptiveRetriever {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        generator: Option<Arc<dyn StructuredGenerator>>,
        reranker: Option<Arc<dyn Reranker>>,
    ) -> Self {
        Self {
            index,
            expander: generator.map(QueryExpansionGenerator::new),
            reranker,
            strategy_configs: default_strategy_configs(),
        }
    }

    /// Replace the strategy registry
    pub fn with_strategy_configs(mut self, configs: Vec<RerankStrategyConfig>) -> Self {
        self.strategy_configs = configs;
        self
    }

    pub fn strategy_configs(&self) -> &[RerankStrategyConfig] {
        &self.strategy_configs
    }

    /// Run one retrieval request. Never fails; see [`RetrievalResult::stats`]
    /// for degradations.
    pub async fn retrieve(
        &self,
        query: &Query,
        scope: &UserScope,
        options: &RetrievalOptions,
    ) -> RetrievalResult {
        self.retrieve_with_cancel(query, scope, options, CancellationToken::new())
            .await
    }

    /// Run one retrieval request, abandoning in-flight work when `cancel`
    /// fires. A cancelled or failed request yields empty `final_results`
    /// with `stats.total_time_ms` populated.
    pub async fn retrieve_with_cancel(
        &self,
        query: &Query,
        scope: &UserScope,
        options: &RetrievalOptions,
        cancel: CancellationToken,
    ) -> RetrievalResult {
        let started = Instant::now();
        let mut result = RetrievalResult::empty(query.text(), query.intent());

        tracing::info!(
            query = query.text(),
            intent = ?query.intent(),
            "Starting adaptive retrieval"
        );

        let outcome = AssertUnwindSafe(self.run(query, scope, options, &cancel, &mut result))
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(degradation)) => Some(degradation),
            Err(_) => Some(StageDegradation::new(
                Stage::Pipeline,
                DegradedReason::Pipeline("retrieval task panicked".to_string()),
            )),
        };
        if let Some(degradation) = failure {
            tracing::warn!("Retrieval abandoned: {}", degradation.reason);
            result.final_results.clear();
            result.strategy = None;
            result.metrics = QualityMetrics::default();
            result.stats.degradations.push(degradation);
        }

        result.stats.final_count = result.final_results.len();
        result.stats.total_time_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            candidates = result.stats.candidate_count,
            results = result.stats.final_count,
            strategy = ?result.strategy,
            degradations = result.stats.degradations.len(),
            total_ms = result.stats.total_time_ms,
            "Adaptive retrieval complete"
        );

        result
    }

    async fn run(
        &self,
        query: &Query,
        scope: &UserScope,
        options: &RetrievalOptions,
        cancel: &CancellationToken,
        result: &mut RetrievalResult,
    ) -> Result<(), StageDegradation> {
        options.validate().map_err(|e| {
            StageDegradation::new(Stage::Pipeline, DegradedReason::Pipeline(e.to_string()))
        })?;

        // Expansion
        let phase = Instant::now();
        let request = ExpansionRequest {
            max_rewrites: if options.use_query_rewriting {
                options.max_rewritten_queries
            } else {
                0
            },
            max_hyde_documents: if options.use_hyde {
                options.max_hyde_documents
            } else {
                0
            },
        };
        match &self.expander {
            Some(expander) if request.max_rewrites + request.max_hyde_documents > 0 => {
                let (expansion, degradations) = expander
                    .expand(query.text(), request, options.generation_timeout(), cancel)
                    .await;
                result.rewritten_queries = expansion.rewritten_queries;
                result.hyde_documents = expansion.hypothetical_documents;
                result.expansion_terms = expansion.expansion_terms;
                result.stats.degradations.extend(degradations);
            }
            Some(_) => tracing::debug!("Query expansion disabled by options"),
            None => tracing::debug!("No generator configured, searching the original query only"),
        }
        result.stats.expansion_ms = phase.elapsed().as_millis() as u64;
        check_cancelled(cancel, Stage::Search)?;

        // Fan-out search + dedup
        let phase = Instant::now();
        let plan = SurfaceQuery::plan(
            query.text(),
            result.rewritten_queries.iter().map(|r| r.query.clone()),
            result.hyde_documents.iter().map(|d| d.content.clone()),
        );
        let budget = per_surface_budget(options.max_candidates, plan.len());
        let params = options.search_params(budget);
        let (per_surface, degradations) = fan_out_search(
            self.index.as_ref(),
            &plan,
            scope,
            &params,
            options.hyde_weight,
            options.search_timeout(),
            cancel,
        )
        .await;
        result.stats.degradations.extend(degradations);
        result.candidate_results = deduplicate(per_surface, options.max_candidates);
        result.stats.candidate_count = result.candidate_results.len();
        result.stats.search_ms = phase.elapsed().as_millis() as u64;

        tracing::debug!(
            surfaces = plan.len(),
            per_surface_budget = budget,
            candidates = result.stats.candidate_count,
            "Candidate search complete"
        );
        check_cancelled(cancel, Stage::Rerank)?;

        // Rerank
        let phase = Instant::now();
        let ranked = if options.use_reranking {
            let (strategy, ranked) = self
                .rerank(
                    query,
                    &result.candidate_results,
                    options,
                    cancel,
                    &mut result.stats.degradations,
                )
                .await;
            result.strategy = Some(strategy);
            ranked
        } else {
            semantic_passthrough(&result.candidate_results)
        };
        result.stats.rerank_ms = phase.elapsed().as_millis() as u64;
        check_cancelled(cancel, Stage::Pipeline)?;

        // Filter + metrics
        let phase = Instant::now();
        result.final_results = apply_final_filter(
            ranked,
            options.min_relevance_score,
            options.final_result_count,
        );
        result.metrics = QualityMetrics::compute(&result.final_results);
        result.stats.filter_ms = phase.elapsed().as_millis() as u64;

        Ok(())
    }

    async fn rerank(
        &self,
        query: &Query,
        candidates: &[Candidate],
        options: &RetrievalOptions,
        cancel: &CancellationToken,
        degradations: &mut Vec<StageDegradation>,
    ) -> (RerankStrategy, Vec<ScoredCandidate>) {
        let selection = select(query.intent(), candidates.len(), options.adaptive_strategy);
        tracing::info!(
            "Rerank strategy: {} ({}, {} candidates)",
            selection.strategy,
            selection.reason,
            candidates.len()
        );

        let strategy = match self.config_for(selection.strategy) {
            Some(config) if config.weight > 0.0 => {
                if !config.applies_to(query.intent()) {
                    tracing::debug!(
                        strategy = %selection.strategy,
                        intent = ?query.intent(),
                        "Selected strategy is outside its registered query types"
                    );
                }
                selection.strategy
            }
            _ if selection.strategy == RerankStrategy::SemanticSimilarity => {
                RerankStrategy::SemanticSimilarity
            }
            _ => {
                tracing::info!(
                    "Strategy {} is disabled in the registry, using semantic similarity",
                    selection.strategy
                );
                RerankStrategy::SemanticSimilarity
            }
        };

        let timeout = options.scoring_timeout();
        let ranked = match strategy {
            RerankStrategy::Cohere => {
                let (ranked, reason) = self
                    .cross_encoder()
                    .rerank_or_passthrough(query.text(), candidates, timeout, cancel)
                    .await;
                if let Some(reason) = reason {
                    degradations.push(StageDegradation::new(Stage::Rerank, reason));
                }
                ranked
            }
            RerankStrategy::Mmr => mmr_select(candidates, self.diversity_weight(options)),
            RerankStrategy::SemanticSimilarity => semantic_passthrough(candidates),
            RerankStrategy::Hybrid => {
                let combiner = HybridCombiner::new(
                    self.cross_encoder(),
                    self.diversity_weight(options),
                    self.hybrid_weights(options),
                );
                let (ranked, hybrid_degradations) =
                    combiner.combine(query.text(), candidates, timeout, cancel).await;
                degradations.extend(hybrid_degradations);
                ranked
            }
        };

        (strategy, ranked)
    }

    fn config_for(&self, strategy: RerankStrategy) -> Option<&RerankStrategyConfig> {
        self.strategy_configs.iter().find(|c| c.strategy == strategy)
    }

    /// Request λ, else the registry's MMR entry
    fn diversity_weight(&self, options: &RetrievalOptions) -> f64 {
        options
            .diversity_weight
            .or_else(|| {
                self.strategy_configs.iter().find_map(|c| match c.params {
                    StrategyParams::Mmr { diversity_weight } => Some(diversity_weight),
                    _ => None,
                })
            })
            .unwrap_or(DEFAULT_DIVERSITY_WEIGHT)
    }

    /// Request weights, else the registry's hybrid entry
    fn hybrid_weights(&self, options: &RetrievalOptions) -> HybridWeights {
        options
            .hybrid_weights
            .or_else(|| {
                self.strategy_configs.iter().find_map(|c| match c.params {
                    StrategyParams::Hybrid { weights } => Some(weights),
                    _ => None,
                })
            })
            .unwrap_or_default()
    }

    /// Cross-encoder limits come from the registry's cohere entry
    fn cross_encoder(&self) -> CrossEncoderStrategy {
        let (max_documents, max_document_chars) = self
            .strategy_configs
            .iter()
            .find_map(|c| match c.params {
                StrategyParams::CrossEncoder {
                    max_documents,
                    max_document_chars,
                } => Some((max_documents, max_document_chars)),
                _ => None,
            })
            .unwrap_or((DEFAULT_MAX_DOCUMENTS, DEFAULT_MAX_DOCUMENT_CHARS));
        CrossEncoderStrategy::new(self.reranker.clone(), max_documents, max_document_chars)
    }
}

fn check_cancelled(cancel: &CancellationToken, stage: Stage) -> Result<(), StageDegradation> {
    if cancel.is_cancelled() {
        return Err(StageDegradation::new(
            Stage::Pipeline,
            DegradedReason::Cancelled { stage },
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::query::QueryIntent;
    use crate::search::{Chunk, HybridSearchParams, SearchHit};
    use async_trait::async_trait;

    /// Returns `count` hits for every query
    struct FixedIndex {
        count: usize,
    }

    #[async_trait]
    impl SearchIndex for FixedIndex {
        async fn search(
            &self,
            _query: &str,
            _scope: &UserScope,
            params: &HybridSearchParams,
        ) -> Result<Vec<SearchHit>> {
            Ok((0..self.count.min(params.max_results))
                .map(|i| SearchHit {
                    chunk: Chunk::new(format!("doc{}", i), "0", format!("topic{} details", i)),
                    similarity: 0.95 - i as f64 * 0.05,
                })
                .collect())
        }
    }

    fn retriever(count: usize) -> AdaptiveRetriever {
        AdaptiveRetriever::new(Arc::new(FixedIndex { count }), None, None)
    }

    #[tokio::test]
    async fn test_without_collaborators_searches_original_only() {
        let result = retriever(3)
            .retrieve(
                &Query::new("refund policy"),
                &UserScope::default(),
                &RetrievalOptions::default(),
            )
            .await;

        assert!(result.rewritten_queries.is_empty());
        assert!(result.hyde_documents.is_empty());
        assert_eq!(result.stats.candidate_count, 3);
        assert_eq!(result.strategy, Some(RerankStrategy::SemanticSimilarity));
        assert_eq!(result.final_results.len(), 3);
        assert!(result.stats.degradations.is_empty());
    }

    #[tokio::test]
    async fn test_cohere_without_reranker_falls_back_to_search_order() {
        let result = retriever(12)
            .retrieve(
                &Query::with_intent("What is the refund policy?", QueryIntent::Factual),
                &UserScope::default(),
                &RetrievalOptions::default(),
            )
            .await;

        assert_eq!(result.strategy, Some(RerankStrategy::Cohere));
        assert!(matches!(
            result.stats.degradations[0].reason,
            DegradedReason::RerankUnavailable(_)
        ));
        assert_eq!(result.final_results[0].candidate.id.document_id, "doc0");
        assert_eq!(result.final_results.len(), 8);
    }

    #[tokio::test]
    async fn test_cancelled_request_returns_empty_result() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = retriever(10)
            .retrieve_with_cancel(
                &Query::new("anything"),
                &UserScope::default(),
                &RetrievalOptions::default(),
                cancel,
            )
            .await;

        assert!(result.final_results.is_empty());
        assert!(result.stats.degradations.iter().any(|d| d.reason.is_cancelled()));
    }

    #[tokio::test]
    async fn test_invalid_options_degrade_instead_of_failing() {
        let options = RetrievalOptions {
            final_result_count: 0,
            ..Default::default()
        };
        let result = retriever(5)
            .retrieve(&Query::new("q"), &UserScope::default(), &options)
            .await;
        assert!(result.final_results.is_empty());
        assert!(matches!(
            result.stats.degradations[0].reason,
            DegradedReason::Pipeline(_)
        ));
    }

    #[tokio::test]
    async fn test_reranking_disabled_skips_selection() {
        let options = RetrievalOptions {
            use_reranking: false,
            ..Default::default()
        };
        let result = retriever(12)
            .retrieve(
                &Query::with_intent("q", QueryIntent::Factual),
                &UserScope::default(),
                &options,
            )
            .await;
        assert_eq!(result.strategy, None);
        assert!(result.stats.degradations.is_empty());
        assert_eq!(
            result.final_results[0].score(RerankStrategy::SemanticSimilarity),
            Some(0.95)
        );
    }

    fn exploratory() -> Query {
        Query::with_intent("Explore onboarding approaches", QueryIntent::Exploratory)
    }

    fn registry_with_mmr_lambda(lambda: f64) -> Vec<RerankStrategyConfig> {
        default_strategy_configs()
            .into_iter()
            .map(|mut config| {
                if config.strategy == RerankStrategy::Mmr {
                    config.params = StrategyParams::Mmr {
                        diversity_weight: lambda,
                    };
                }
                config
            })
            .collect()
    }

    #[tokio::test]
    async fn test_registry_mmr_lambda_changes_ranking() {
        let options = RetrievalOptions::default();
        let default_result = retriever(10)
            .retrieve(&exploratory(), &UserScope::default(), &options)
            .await;
        let relevance_only = retriever(10)
            .with_strategy_configs(registry_with_mmr_lambda(1.0))
            .retrieve(&exploratory(), &UserScope::default(), &options)
            .await;

        assert_eq!(default_result.strategy, Some(RerankStrategy::Mmr));
        assert_eq!(relevance_only.strategy, Some(RerankStrategy::Mmr));
        // Seed score is λ·rel + (1−λ)
        assert!((default_result.final_results[0].final_score - 0.985).abs() < 1e-9);
        assert!((relevance_only.final_results[0].final_score - 0.95).abs() < 1e-9);
        assert_ne!(default_result.final_results, relevance_only.final_results);
        // λ = 1 ranks purely by relevance
        for scored in &relevance_only.final_results {
            assert!((scored.final_score - scored.candidate.similarity).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_request_lambda_overrides_registry() {
        let options = RetrievalOptions {
            diversity_weight: Some(0.3),
            ..Default::default()
        };
        let result = retriever(10)
            .with_strategy_configs(registry_with_mmr_lambda(1.0))
            .retrieve(&exploratory(), &UserScope::default(), &options)
            .await;
        assert!((result.final_results[0].final_score - 0.985).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_registry_hybrid_weights_are_used() {
        let registry: Vec<RerankStrategyConfig> = default_strategy_configs()
            .into_iter()
            .map(|mut config| {
                if config.strategy == RerankStrategy::Hybrid {
                    config.params = StrategyParams::Hybrid {
                        weights: HybridWeights {
                            cohere: 0.0,
                            mmr: 0.0,
                            semantic: 1.0,
                        },
                    };
                }
                config
            })
            .collect();
        let options = RetrievalOptions {
            adaptive_strategy: false,
            ..Default::default()
        };
        let result = retriever(10)
            .with_strategy_configs(registry)
            .retrieve(&exploratory(), &UserScope::default(), &options)
            .await;

        assert_eq!(result.strategy, Some(RerankStrategy::Hybrid));
        for scored in &result.final_results {
            assert!((scored.final_score - scored.candidate.similarity).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_zero_weight_strategy_falls_back_to_semantic() {
        let registry: Vec<RerankStrategyConfig> = default_strategy_configs()
            .into_iter()
            .map(|mut config| {
                if config.strategy == RerankStrategy::Mmr {
                    config.weight = 0.0;
                }
                config
            })
            .collect();
        let result = retriever(10)
            .with_strategy_configs(registry)
            .retrieve(&exploratory(), &UserScope::default(), &RetrievalOptions::default())
            .await;

        assert_eq!(result.strategy, Some(RerankStrategy::SemanticSimilarity));
        assert_eq!(result.final_results[0].final_score, 0.95);
        assert!(result.stats.degradations.is_empty());
    }

}
