//! Terminal output formatter

use super::FormatOptions;
use adaptrag_core::rerank::StrategySelection;
use adaptrag_core::{QueryIntent, RetrievalResult};

const PREVIEW_LINES: usize = 3;

pub fn format_retrieval(result: &RetrievalResult, options: &FormatOptions) -> String {
    let mut output = String::new();

    let strategy = result
        .strategy
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none".to_string());
    let intent = result
        .intent
        .map(|i| i.to_string())
        .unwrap_or_else(|| "unclassified".to_string());
    output.push_str(&format!(
        "query: {} [{}] strategy: {}\n",
        result.original_query, intent, strategy
    ));
    for rewrite in &result.rewritten_queries {
        output.push_str(&format!("  rewrite ({}): {}\n", rewrite.focus, rewrite.query));
    }
    if !result.hyde_documents.is_empty() {
        output.push_str(&format!("  hyde documents: {}\n", result.hyde_documents.len()));
    }
    output.push('\n');

    for scored in &result.final_results {
        let candidate = &scored.candidate;
        let score_pct = (scored.final_score * 100.0).round() as u32;
        let title = candidate.chunk.title.as_deref().unwrap_or("");
        output.push_str(&format!(
            "{:>3}% {} ({}) {}\n",
            score_pct, candidate.id, candidate.surface, title
        ));

        let lines: Vec<&str> = if options.full {
            candidate.content().lines().collect()
        } else {
            candidate.content().lines().take(PREVIEW_LINES).collect()
        };
        for line in &lines {
            output.push_str(&format!("  {}\n", line));
        }
        if !options.full && candidate.content().lines().count() > PREVIEW_LINES {
            output.push_str("  ...\n");
        }
    }

    let stats = &result.stats;
    let metrics = &result.metrics;
    output.push_str(&format!(
        "\n{} of {} candidates in {}ms (expand {}ms, search {}ms, rerank {}ms)\n",
        stats.final_count,
        stats.candidate_count,
        stats.total_time_ms,
        stats.expansion_ms,
        stats.search_ms,
        stats.rerank_ms
    ));
    output.push_str(&format!(
        "relevance {:.2}  diversity {:.2}  coverage {:.2}  precision {:.2}\n",
        metrics.average_relevance, metrics.diversity, metrics.coverage, metrics.precision
    ));
    for degradation in &stats.degradations {
        match &degradation.surface {
            Some(surface) => output.push_str(&format!(
                "degraded {} [{}]: {}\n",
                degradation.stage, surface, degradation.reason
            )),
            None => output.push_str(&format!(
                "degraded {}: {}\n",
                degradation.stage, degradation.reason
            )),
        }
    }

    output
}

pub fn format_selection(
    intent: Option<QueryIntent>,
    candidates: usize,
    selection: &StrategySelection,
) -> String {
    let intent = intent
        .map(|i| i.to_string())
        .unwrap_or_else(|| "unclassified".to_string());
    format!(
        "{} (intent: {}, candidates: {}; {})\n",
        selection.strategy, intent, candidates, selection.reason
    )
}
