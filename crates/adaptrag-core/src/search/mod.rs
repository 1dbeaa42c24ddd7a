//! Candidate retrieval
//!
//! Provides:
//! - The hybrid search index collaborator interface
//! - Concurrent fan-out across expansion surfaces
//! - First-seen-wins candidate deduplication
//! - An in-memory index for local corpora and tests

mod dedup;
mod fanout;
mod memory;
pub mod text;

pub use dedup::deduplicate;
pub use fanout::{fan_out_search, per_surface_budget, SurfaceQuery};
pub use memory::MemoryIndex;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable chunk identity (document id + chunk id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId {
    pub document_id: String,
    pub chunk_id: String,
}

impl ChunkId {
    pub fn new(document_id: impl Into<String>, chunk_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            chunk_id: chunk_id.into(),
        }
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document_id, self.chunk_id)
    }
}

/// A content chunk as stored in the search index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: String,
    pub chunk_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl Chunk {
    pub fn new(
        document_id: impl Into<String>,
        chunk_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            chunk_id: chunk_id.into(),
            content: content.into(),
            title: None,
            source_url: None,
            collection: None,
        }
    }

    pub fn id(&self) -> ChunkId {
        ChunkId::new(self.document_id.clone(), self.chunk_id.clone())
    }
}

/// Which expansion surface surfaced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSurface {
    Original,
    Rewritten,
    Hyde,
}

impl SearchSurface {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSurface::Original => "original",
            SearchSurface::Rewritten => "rewritten",
            SearchSurface::Hyde => "hyde",
        }
    }
}

impl fmt::Display for SearchSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A retrieved chunk reference prior to reranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: ChunkId,
    pub chunk: Chunk,
    /// Base similarity in [0, 1], HyDE-weighted for HyDE surfaces
    pub similarity: f64,
    pub surface: SearchSurface,
}

impl Candidate {
    pub fn new(chunk: Chunk, similarity: f64, surface: SearchSurface) -> Self {
        Self {
            id: chunk.id(),
            chunk,
            similarity: clamp_unit(similarity),
            surface,
        }
    }

    pub fn content(&self) -> &str {
        &self.chunk.content
    }
}

/// Raw hit returned by the search index
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub similarity: f64,
}

/// Who is searching and which collections they may see
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserScope {
    #[serde(default)]
    pub user_id: Option<String>,
    /// Restrict to these collections; empty means all
    #[serde(default)]
    pub collections: Vec<String>,
}

impl UserScope {
    pub fn allows(&self, chunk: &Chunk) -> bool {
        if self.collections.is_empty() {
            return true;
        }
        chunk
            .collection
            .as_ref()
            .map(|c| self.collections.iter().any(|allowed| allowed == c))
            .unwrap_or(false)
    }
}

/// Per-call parameters for the hybrid search index
#[derive(Debug, Clone, PartialEq)]
pub struct HybridSearchParams {
    pub max_results: usize,
    pub vector_weight: f64,
    pub bm25_weight: f64,
    pub min_vector_similarity: f64,
}

impl Default for HybridSearchParams {
    fn default() -> Self {
        Self {
            max_results: 20,
            vector_weight: 0.7,
            bm25_weight: 0.3,
            min_vector_similarity: 0.1,
        }
    }
}

/// Embedding/lexical hybrid search collaborator
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Search for chunks similar to `query`
    async fn search(
        &self,
        query: &str,
        scope: &UserScope,
        params: &HybridSearchParams,
    ) -> Result<Vec<SearchHit>>;
}

/// Clamp a score into [0, 1], mapping NaN to 0
pub fn clamp_unit(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
