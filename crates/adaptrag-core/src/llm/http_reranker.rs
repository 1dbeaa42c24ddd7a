//! Cohere-compatible HTTP cross-encoder reranker

use super::{RerankHit, Reranker};
use crate::config::RerankServiceConfig;
use crate::error::{AdaptragError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Reranker backed by a `/v1/rerank` endpoint
pub struct HttpReranker {
    http_client: reqwest::Client,
    config: RerankServiceConfig,
}

impl HttpReranker {
    /// Create from configuration
    pub fn from_config(config: RerankServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(RerankServiceConfig::default())
    }

    pub fn has_credentials(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(AdaptragError::MissingCredentials("rerank service".to_string())),
        };

        let body = serde_json::json!({
            "model": self.config.model,
            "query": query,
            "documents": documents,
            "top_n": top_n.min(documents.len()),
        });

        let url = format!("{}/v1/rerank", self.config.url.trim_end_matches('/'));
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AdaptragError::ExternalError(format!(
                "Rerank service error (HTTP {}): {}",
                status, body
            )));
        }

        let json: Value = response.json().await?;
        parse_rerank_response(&json, documents.len())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Parse `results[].{index, relevance_score}`, dropping out-of-range indices
fn parse_rerank_response(json: &Value, doc_count: usize) -> Result<Vec<RerankHit>> {
    let results = json
        .get("results")
        .or_else(|| json.get("data"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| AdaptragError::Rerank("response is missing results array".to_string()))?;

    let mut hits = Vec::with_capacity(results.len());
    for item in results {
        let index = item
            .get("index")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| AdaptragError::Rerank("result missing index".to_string()))?
            as usize;
        let score = item
            .get("relevance_score")
            .or_else(|| item.get("score"))
            .and_then(|v| v.as_f64())
            .ok_or_else(|| AdaptragError::Rerank("result missing relevance score".to_string()))?;

        if index < doc_count {
            hits.push(RerankHit {
                index,
                relevance_score: score,
            });
        } else {
            tracing::warn!(index, doc_count, "Rerank result index out of range");
        }
    }

    Ok(hits)
}
