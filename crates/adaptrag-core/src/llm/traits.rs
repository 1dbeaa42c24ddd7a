//! Collaborator trait definitions

use crate::error::Result;
use async_trait::async_trait;

/// Structured-generation service.
///
/// Fails closed: malformed or non-JSON output is an error, never a
/// partially filled value.
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    /// Generate a JSON value conforming to `schema`
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        temperature: f32,
    ) -> Result<serde_json::Value>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Cross-encoder relevance scoring service
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score `documents` against `query`, returning at most `top_n` hits
    /// ordered by descending relevance
    async fn rerank(&self, query: &str, documents: &[String], top_n: usize)
        -> Result<Vec<RerankHit>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// One scored document from the reranker
#[derive(Debug, Clone, PartialEq)]
pub struct RerankHit {
    /// Index into the submitted document list
    pub index: usize,
    pub relevance_score: f64,
}
