//! JSON output formatter

use adaptrag_core::rerank::StrategySelection;
use adaptrag_core::{QueryIntent, RetrievalResult};

pub fn format_retrieval(result: &RetrievalResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string()) + "\n"
}

pub fn format_selection(
    intent: Option<QueryIntent>,
    candidates: usize,
    selection: &StrategySelection,
) -> String {
    let output = serde_json::json!({
        "intent": intent,
        "candidates": candidates,
        "strategy": selection.strategy,
        "reason": selection.reason,
    });
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string()) + "\n"
}
