//! Query-adaptive strategy selection

use super::RerankStrategy;
use crate::query::QueryIntent;
use serde::Serialize;

/// Strategy choice with a short explanation for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrategySelection {
    pub strategy: RerankStrategy,
    pub reason: &'static str,
}

/// Pure decision table from (intent, candidate count) to a strategy
pub fn select(
    intent: Option<QueryIntent>,
    candidate_count: usize,
    adaptive: bool,
) -> StrategySelection {
    use RerankStrategy::*;

    let pick = |strategy, reason| StrategySelection { strategy, reason };

    if !adaptive {
        return pick(Hybrid, "adaptive selection disabled");
    }
    if candidate_count < 5 {
        return pick(SemanticSimilarity, "too few candidates for reranking");
    }

    match intent {
        Some(QueryIntent::Comparative) if candidate_count >= 15 => {
            pick(Hybrid, "comparative query with a deep candidate pool")
        }
        Some(QueryIntent::Comparative) => pick(Mmr, "comparative query needs diversity"),
        Some(QueryIntent::Factual | QueryIntent::Temporal | QueryIntent::Causal) => {
            pick(Cohere, "narrowly answerable query")
        }
        Some(QueryIntent::Exploratory) => pick(Mmr, "exploratory query favors diversity"),
        Some(QueryIntent::Analytical) if candidate_count >= 20 => {
            pick(Hybrid, "analytical query with a deep candidate pool")
        }
        Some(QueryIntent::Analytical) => pick(Cohere, "analytical query with a small pool"),
        None if candidate_count >= 20 => pick(Hybrid, "unclassified query, large pool"),
        None if candidate_count >= 10 => pick(Cohere, "unclassified query, medium pool"),
        None => pick(SemanticSimilarity, "unclassified query, small pool"),
    }
}

/// Strategy only; see [`select`]
pub fn select_strategy(
    intent: Option<QueryIntent>,
    candidate_count: usize,
    adaptive: bool,
) -> RerankStrategy {
    select(intent, candidate_count, adaptive).strategy
}
