//! In-memory hybrid index over a fixed set of chunks

use super::text::{content_terms, jaccard, term_overlap, token_set};
use super::{Chunk, HybridSearchParams, SearchHit, SearchIndex, UserScope};
use crate::error::{AdaptragError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;

struct IndexedChunk {
    chunk: Chunk,
    tokens: HashSet<String>,
    terms: HashSet<String>,
}

/// Lexical stand-in for an embedding/BM25 hybrid index.
///
/// Term overlap plays the BM25 role and token Jaccard the vector role,
/// blended with the request's weights.
pub struct MemoryIndex {
    chunks: Vec<IndexedChunk>,
}

impl MemoryIndex {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        let chunks = chunks
            .into_iter()
            .map(|chunk| IndexedChunk {
                tokens: token_set(&chunk.content),
                terms: content_terms(&chunk.content),
                chunk,
            })
            .collect();
        Self { chunks }
    }

    /// Load a JSON array of chunks
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let chunks: Vec<Chunk> = serde_json::from_str(&content)?;
        if chunks.is_empty() {
            return Err(AdaptragError::InvalidInput(format!(
                "corpus {} contains no chunks",
                path.display()
            )));
        }
        Ok(Self::new(chunks))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn search(
        &self,
        query: &str,
        scope: &UserScope,
        params: &HybridSearchParams,
    ) -> Result<Vec<SearchHit>> {
        let query_tokens = token_set(query);
        let query_terms = content_terms(query);
        let total_weight = params.vector_weight + params.bm25_weight;
        if total_weight <= 0.0 {
            return Err(AdaptragError::InvalidInput(
                "hybrid search weights sum to zero".to_string(),
            ));
        }

        let mut hits: Vec<SearchHit> = self
            .chunks
            .iter()
            .filter(|indexed| scope.allows(&indexed.chunk))
            .filter_map(|indexed| {
                let lexical = term_overlap(&query_terms, &indexed.terms);
                let vector = jaccard(&query_tokens, &indexed.tokens);
                let score =
                    (params.bm25_weight * lexical + params.vector_weight * vector) / total_weight;
                (score > 0.0 && score >= params.min_vector_similarity).then(|| SearchHit {
                    chunk: indexed.chunk.clone(),
                    similarity: score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(params.max_results);

        Ok(hits)
    }
}
