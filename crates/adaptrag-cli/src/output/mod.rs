//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use adaptrag_core::rerank::StrategySelection;
use adaptrag_core::{QueryIntent, RetrievalResult};

/// Format options
pub struct FormatOptions {
    pub full: bool,
}

/// Format a retrieval result
pub fn format_retrieval(
    result: &RetrievalResult,
    format: OutputFormat,
    options: &FormatOptions,
) -> String {
    match format {
        OutputFormat::Json => json::format_retrieval(result),
        OutputFormat::Cli => terminal::format_retrieval(result, options),
    }
}

/// Format a strategy selection
pub fn format_selection(
    intent: Option<QueryIntent>,
    candidates: usize,
    selection: &StrategySelection,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Json => json::format_selection(intent, candidates, selection),
        OutputFormat::Cli => terminal::format_selection(intent, candidates, selection),
    }
}
