//! LLM and scoring service integration
//!
//! Provides traits and implementations for:
//! - Structured generation via OpenAI-compatible services (vLLM, OpenAI, etc.)
//! - Query rewriting and HyDE generation
//! - Cross-encoder reranking via Cohere-compatible services

mod cache;
mod client;
mod http_reranker;
mod query_expansion;
mod traits;

pub use cache::{generation_cache_key, CacheStats, GenerationCache};
pub use client::{ChatMessage, MetricsSnapshot, VLLMClient};
pub use http_reranker::HttpReranker;
pub use query_expansion::{
    ExpansionRequest, HypotheticalDocument, QueryExpansion, QueryExpansionGenerator, RewriteSet,
    RewrittenQuery, MAX_EXPANSION_TERMS, MAX_HYDE_DOCUMENTS, MAX_REWRITES,
};
pub use traits::*;
