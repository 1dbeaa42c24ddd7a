//! Cross-encoder reranking through an external relevance service

use super::{rescore_with_similarity, sort_by_final_score, RerankStrategy, ScoredCandidate};
use crate::deadline::with_deadline;
use crate::error::{DegradedReason, Stage};
use crate::llm::Reranker;
use crate::search::Candidate;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Truncate to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Scores candidates with a [`Reranker`] collaborator
#[derive(Clone)]
pub struct CrossEncoderStrategy {
    reranker: Option<Arc<dyn Reranker>>,
    max_documents: usize,
    max_document_chars: usize,
}

impl CrossEncoderStrategy {
    pub fn new(
        reranker: Option<Arc<dyn Reranker>>,
        max_documents: usize,
        max_document_chars: usize,
    ) -> Self {
        Self {
            reranker,
            max_documents,
            max_document_chars,
        }
    }

    pub fn is_available(&self) -> bool {
        self.reranker.is_some()
    }

    /// Rerank the first `max_documents` candidates.
    ///
    /// Only candidates the service returned a score for are kept, ordered by
    /// descending relevance. An empty response counts as unavailable.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: &[Candidate],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScoredCandidate>, DegradedReason> {
        let reranker = self.reranker.as_ref().ok_or_else(|| {
            DegradedReason::RerankUnavailable("no reranker configured".to_string())
        })?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let submitted = &candidates[..candidates.len().min(self.max_documents)];
        let documents: Vec<String> = submitted
            .iter()
            .map(|c| truncate_chars(c.content(), self.max_document_chars).to_string())
            .collect();

        let hits = with_deadline(
            Stage::Rerank,
            timeout,
            cancel,
            reranker.rerank(query, &documents, documents.len()),
        )
        .await?;

        if hits.is_empty() {
            return Err(DegradedReason::RerankUnavailable(
                "reranker returned no results".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut scored: Vec<ScoredCandidate> = hits
            .into_iter()
            .filter(|hit| hit.index < submitted.len() && seen.insert(hit.index))
            .map(|hit| {
                ScoredCandidate::new(
                    submitted[hit.index].clone(),
                    RerankStrategy::Cohere,
                    hit.relevance_score,
                )
            })
            .collect();
        sort_by_final_score(&mut scored);

        tracing::debug!(
            model = reranker.model_name(),
            submitted = submitted.len(),
            scored = scored.len(),
            "Cross-encoder rerank complete"
        );

        Ok(scored)
    }

    /// Rerank, falling back to the candidates' similarity in their current
    /// order when the service is unavailable
    pub async fn rerank_or_passthrough(
        &self,
        query: &str,
        candidates: &[Candidate],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> (Vec<ScoredCandidate>, Option<DegradedReason>) {
        match self.rerank(query, candidates, timeout, cancel).await {
            Ok(scored) => (scored, None),
            Err(reason) => {
                tracing::warn!("Cross-encoder unavailable, keeping search order: {}", reason);
                (
                    rescore_with_similarity(candidates, RerankStrategy::Cohere),
                    Some(reason),
                )
            }
        }
    }
}
