//! Reranking strategies
//!
//! Provides:
//! - Query-adaptive strategy selection
//! - Cross-encoder scoring through an external relevance API
//! - MMR diversity selection over lexical similarity
//! - Semantic-similarity passthrough
//! - A hybrid combiner blending all three

mod cross_encoder;
mod hybrid;
mod mmr;
mod selector;
mod semantic;

pub use cross_encoder::{truncate_chars, CrossEncoderStrategy};
pub use hybrid::HybridCombiner;
pub use mmr::mmr_select;
pub use selector::{select, select_strategy, StrategySelection};
pub use semantic::{rescore_with_similarity, semantic_passthrough};

use crate::error::AdaptragError;
use crate::query::QueryIntent;
use crate::search::{clamp_unit, Candidate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Named reranking strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankStrategy {
    Cohere,
    Mmr,
    SemanticSimilarity,
    Hybrid,
}

impl RerankStrategy {
    pub const ALL: [RerankStrategy; 4] = [
        RerankStrategy::Cohere,
        RerankStrategy::Mmr,
        RerankStrategy::SemanticSimilarity,
        RerankStrategy::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RerankStrategy::Cohere => "cohere",
            RerankStrategy::Mmr => "mmr",
            RerankStrategy::SemanticSimilarity => "semantic_similarity",
            RerankStrategy::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for RerankStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RerankStrategy {
    type Err = AdaptragError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RerankStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s.trim())
            .ok_or_else(|| AdaptragError::InvalidInput(format!("unknown rerank strategy: {}", s)))
    }
}

/// Per-component weights for the hybrid combiner.
///
/// The combined score is normalized by the weight total, so the default
/// 0.4/0.2/0.1 split behaves like 0.57/0.29/0.14.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridWeights {
    #[serde(default = "default_cohere_weight")]
    pub cohere: f64,
    #[serde(default = "default_mmr_weight")]
    pub mmr: f64,
    #[serde(default = "default_semantic_weight")]
    pub semantic: f64,
}

fn default_cohere_weight() -> f64 {
    0.4
}

fn default_mmr_weight() -> f64 {
    0.2
}

fn default_semantic_weight() -> f64 {
    0.1
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            cohere: default_cohere_weight(),
            mmr: default_mmr_weight(),
            semantic: default_semantic_weight(),
        }
    }
}

impl HybridWeights {
    pub fn total(&self) -> f64 {
        self.cohere + self.mmr + self.semantic
    }
}

/// Strategy-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyParams {
    CrossEncoder {
        max_documents: usize,
        max_document_chars: usize,
    },
    Mmr {
        diversity_weight: f64,
    },
    SemanticSimilarity,
    Hybrid {
        weights: HybridWeights,
    },
}

/// Registry entry describing one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankStrategyConfig {
    pub strategy: RerankStrategy,
    /// Applicability weight; a strategy at zero weight, or with no entry,
    /// is replaced by semantic similarity
    pub weight: f64,
    /// Intents this strategy is intended for; `None` means any
    #[serde(default)]
    pub query_types: Option<Vec<QueryIntent>>,
    pub params: StrategyParams,
}

impl RerankStrategyConfig {
    pub fn applies_to(&self, intent: Option<QueryIntent>) -> bool {
        match (&self.query_types, intent) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(types), Some(intent)) => types.contains(&intent),
        }
    }
}

/// Built-in strategy registry
pub fn default_strategy_configs() -> Vec<RerankStrategyConfig> {
    vec![
        RerankStrategyConfig {
            strategy: RerankStrategy::Cohere,
            weight: 0.4,
            query_types: Some(vec![
                QueryIntent::Factual,
                QueryIntent::Temporal,
                QueryIntent::Causal,
                QueryIntent::Analytical,
            ]),
            params: StrategyParams::CrossEncoder {
                max_documents: 50,
                max_document_chars: 800,
            },
        },
        RerankStrategyConfig {
            strategy: RerankStrategy::Mmr,
            weight: 0.2,
            query_types: Some(vec![QueryIntent::Exploratory, QueryIntent::Comparative]),
            params: StrategyParams::Mmr {
                diversity_weight: 0.3,
            },
        },
        RerankStrategyConfig {
            strategy: RerankStrategy::SemanticSimilarity,
            weight: 0.1,
            query_types: None,
            params: StrategyParams::SemanticSimilarity,
        },
        RerankStrategyConfig {
            strategy: RerankStrategy::Hybrid,
            weight: 0.3,
            query_types: Some(vec![QueryIntent::Comparative, QueryIntent::Analytical]),
            params: StrategyParams::Hybrid {
                weights: HybridWeights::default(),
            },
        },
    ]
}

/// A candidate with per-strategy scores and a final score in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub scores: BTreeMap<RerankStrategy, f64>,
    pub final_score: f64,
}

impl ScoredCandidate {
    /// Score a candidate with a single strategy's output
    pub fn new(candidate: Candidate, strategy: RerankStrategy, score: f64) -> Self {
        let score = clamp_unit(score);
        let mut scores = BTreeMap::new();
        scores.insert(strategy, score);
        Self {
            candidate,
            scores,
            final_score: score,
        }
    }

    pub fn score(&self, strategy: RerankStrategy) -> Option<f64> {
        self.scores.get(&strategy).copied()
    }
}

/// Stable sort by descending final score; ties keep insertion order
pub fn sort_by_final_score(scored: &mut [ScoredCandidate]) {
    scored.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
