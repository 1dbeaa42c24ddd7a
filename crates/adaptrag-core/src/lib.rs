//! Adaptrag Core Library
//!
//! Multi-strategy adaptive retrieval and reranking for retrieval-augmented
//! generation.
//!
//! # Features
//! - Query rewriting and HyDE expansion via structured LLM generation
//! - Concurrent fan-out search across expansion surfaces
//! - First-seen-wins candidate deduplication
//! - Query-adaptive reranking: cross-encoder, MMR, semantic and hybrid
//! - Per-stage degradation reporting, deadlines and cancellation
//! - Diagnostic quality metrics

pub mod config;
pub mod deadline;
pub mod error;
pub mod llm;
pub mod query;
pub mod rerank;
pub mod retrieval;
pub mod search;

pub use config::{Config, LLMServiceConfig, RerankServiceConfig};
pub use error::{AdaptragError, DegradedReason, Error, Result, Stage, StageDegradation};
pub use llm::{
    HttpReranker, QueryExpansion, QueryExpansionGenerator, RerankHit, Reranker,
    StructuredGenerator, VLLMClient,
};
pub use query::{Query, QueryIntent};
pub use rerank::{
    select_strategy, HybridWeights, RerankStrategy, RerankStrategyConfig, ScoredCandidate,
};
pub use retrieval::{
    AdaptiveRetriever, QualityMetrics, RetrievalOptions, RetrievalResult, RetrievalStats,
};
pub use search::{Candidate, Chunk, ChunkId, MemoryIndex, SearchIndex, SearchSurface, UserScope};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "adaptrag";
