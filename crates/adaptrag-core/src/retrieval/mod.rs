//! Adaptive retrieval pipeline
//!
//! Expansion, fan-out search, deduplication, strategy selection,
//! reranking and the final filter, composed into one request.

mod filter;
mod metrics;
mod pipeline;

pub use filter::apply_final_filter;
pub use metrics::QualityMetrics;
pub use pipeline::AdaptiveRetriever;

use crate::error::{AdaptragError, Result, StageDegradation};
use crate::llm::{HypotheticalDocument, RewrittenQuery};
use crate::query::QueryIntent;
use crate::rerank::{HybridWeights, RerankStrategy, ScoredCandidate};
use crate::search::{Candidate, HybridSearchParams};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-request retrieval options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalOptions {
    pub use_query_rewriting: bool,
    pub use_hyde: bool,
    pub use_reranking: bool,
    /// Select the strategy from intent and pool size; otherwise always hybrid
    pub adaptive_strategy: bool,
    pub max_rewritten_queries: usize,
    pub max_hyde_documents: usize,
    /// Multiplier applied to HyDE-sourced similarities
    pub hyde_weight: f64,
    /// MMR λ; overrides the registry's MMR entry when set
    pub diversity_weight: Option<f64>,
    pub min_relevance_score: f64,
    pub max_candidates: usize,
    pub final_result_count: usize,
    /// Overrides the registry's hybrid entry when set
    pub hybrid_weights: Option<HybridWeights>,
    pub vector_weight: f64,
    pub bm25_weight: f64,
    pub min_vector_similarity: f64,
    pub generation_timeout_ms: u64,
    pub search_timeout_ms: u64,
    pub scoring_timeout_ms: u64,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            use_query_rewriting: true,
            use_hyde: true,
            use_reranking: true,
            adaptive_strategy: true,
            max_rewritten_queries: 3,
            max_hyde_documents: 1,
            hyde_weight: 0.25,
            diversity_weight: None,
            min_relevance_score: 0.3,
            max_candidates: 30,
            final_result_count: 8,
            hybrid_weights: None,
            vector_weight: 0.7,
            bm25_weight: 0.3,
            min_vector_similarity: 0.1,
            generation_timeout_ms: 8_000,
            search_timeout_ms: 5_000,
            scoring_timeout_ms: 4_000,
        }
    }
}

impl RetrievalOptions {
    /// Reject options that cannot produce a meaningful request
    pub fn validate(&self) -> Result<()> {
        if self.final_result_count == 0 {
            return Err(AdaptragError::InvalidInput(
                "final_result_count must be at least 1".to_string(),
            ));
        }
        if self.max_candidates == 0 {
            return Err(AdaptragError::InvalidInput(
                "max_candidates must be at least 1".to_string(),
            ));
        }

        let unit_fields = [
            ("hyde_weight", Some(self.hyde_weight)),
            ("diversity_weight", self.diversity_weight),
            ("min_relevance_score", Some(self.min_relevance_score)),
            ("vector_weight", Some(self.vector_weight)),
            ("bm25_weight", Some(self.bm25_weight)),
            ("min_vector_similarity", Some(self.min_vector_similarity)),
        ];
        for (name, value) in unit_fields {
            let Some(value) = value else { continue };
            if !(0.0..=1.0).contains(&value) {
                return Err(AdaptragError::InvalidInput(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if let Some(weights) = &self.hybrid_weights {
            validate_hybrid_weights(weights)?;
        }

        Ok(())
    }

    /// Search parameters for one surface given its candidate budget
    pub fn search_params(&self, max_results: usize) -> HybridSearchParams {
        HybridSearchParams {
            max_results,
            vector_weight: self.vector_weight,
            bm25_weight: self.bm25_weight,
            min_vector_similarity: self.min_vector_similarity,
        }
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn scoring_timeout(&self) -> Duration {
        Duration::from_millis(self.scoring_timeout_ms)
    }
}

/// Per-phase timings, counts and degradations for one request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalStats {
    pub expansion_ms: u64,
    pub search_ms: u64,
    pub rerank_ms: u64,
    pub filter_ms: u64,
    pub total_time_ms: u64,
    pub candidate_count: usize,
    pub final_count: usize,
    /// Why any stage fell back; empty when every stage succeeded
    pub degradations: Vec<StageDegradation>,
}

/// Externally visible outcome of one retrieval request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub original_query: String,
    pub intent: Option<QueryIntent>,
    pub rewritten_queries: Vec<RewrittenQuery>,
    pub hyde_documents: Vec<HypotheticalDocument>,
    pub expansion_terms: Vec<String>,
    /// Deduplicated candidate set prior to reranking
    pub candidate_results: Vec<Candidate>,
    pub final_results: Vec<ScoredCandidate>,
    /// Strategy that produced `final_results`; `None` when reranking was skipped
    pub strategy: Option<RerankStrategy>,
    pub stats: RetrievalStats,
    pub metrics: QualityMetrics,
}

impl RetrievalResult {
    /// Well-formed empty result for a request that produced nothing
    pub fn empty(original_query: impl Into<String>, intent: Option<QueryIntent>) -> Self {
        Self {
            original_query: original_query.into(),
            intent,
            rewritten_queries: Vec::new(),
            hyde_documents: Vec::new(),
            expansion_terms: Vec::new(),
            candidate_results: Vec::new(),
            final_results: Vec::new(),
            strategy: None,
            stats: RetrievalStats::default(),
            metrics: QualityMetrics::default(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.stats.degradations.is_empty()
    }
}

/// Hybrid weights must be non-negative and not all zero
fn validate_hybrid_weights(weights: &HybridWeights) -> Result<()> {
    if [weights.cohere, weights.mmr, weights.semantic]
        .iter()
        .any(|w| !w.is_finite() || *w < 0.0)
    {
        return Err(AdaptragError::InvalidInput(
            "hybrid weights must be non-negative".to_string(),
        ));
    }
    if weights.total() <= 0.0 {
        return Err(AdaptragError::InvalidInput(
            "hybrid weights must not all be zero".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(RetrievalOptions::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let options = RetrievalOptions {
            hyde_weight: 1.5,
            ..Default::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("hyde_weight"));

        let options = RetrievalOptions {
            max_candidates: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = RetrievalOptions {
            hybrid_weights: Some(HybridWeights {
                cohere: 0.0,
                mmr: 0.0,
                semantic: 0.0,
            }),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_search_params_carry_weights() {
        let options = RetrievalOptions {
            vector_weight: 0.5,
            ..Default::default()
        };
        let params = options.search_params(7);
        assert_eq!(params.max_results, 7);
        assert_eq!(params.vector_weight, 0.5);
        assert_eq!(params.bm25_weight, 0.3);
    }

    #[test]
    fn test_partial_options_deserialize_with_defaults() {
        let options: RetrievalOptions =
            serde_json::from_str(r#"{"use_hyde": false, "final_result_count": 4}"#).unwrap();
        assert!(!options.use_hyde);
        assert_eq!(options.final_result_count, 4);
        assert_eq!(options.max_candidates, 30);
    }
}
