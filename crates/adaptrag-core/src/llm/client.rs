//! HTTP client for OpenAI-compatible LLM services (vLLM, OpenAI, etc.)

use super::cache::{generation_cache_key, GenerationCache};
use super::StructuredGenerator;
use crate::config::LLMServiceConfig;
use crate::error::{AdaptragError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// API metrics for monitoring
#[derive(Debug, Default)]
struct APIMetrics {
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub avg_latency_ms: f64,
}

/// vLLM/OpenAI-compatible structured-generation client
pub struct VLLMClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    cache: Arc<GenerationCache>,
    metrics: Arc<APIMetrics>,
}

impl VLLMClient {
    /// Create new client from configuration
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            config,
            cache: Arc::new(GenerationCache::new()),
            metrics: Arc::new(APIMetrics::default()),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LLMServiceConfig::default())
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        let total = self.metrics.total_requests.load(Ordering::Relaxed);
        let hits = self.metrics.cache_hits.load(Ordering::Relaxed);
        let misses = self.metrics.cache_misses.load(Ordering::Relaxed);
        let remote = total.saturating_sub(hits);

        MetricsSnapshot {
            total_requests: total,
            total_errors: self.metrics.total_errors.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate: if total > 0 {
                hits as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            avg_latency_ms: if remote > 0 {
                self.metrics.total_latency_ms.load(Ordering::Relaxed) as f64 / remote as f64
            } else {
                0.0
            },
        }
    }

    fn record_error(&self) {
        self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        schema: &serde_json::Value,
        temperature: f32,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
            response_format: serde_json::Value,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature,
            max_tokens: self.config.max_tokens,
            response_format: serde_json::json!({
                "type": "json_schema",
                "json_schema": { "name": "response", "schema": schema, "strict": true }
            }),
        };

        let url = format!("{}/v1/chat/completions", self.config.url.trim_end_matches('/'));

        let mut req = self.http_client.post(&url).json(&request);

        if let Some(ref api_key) = self.config.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AdaptragError::ExternalError(format!(
                "LLM service error (HTTP {}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AdaptragError::Llm("No response from LLM".to_string()))
    }
}

#[async_trait]
impl StructuredGenerator for VLLMClient {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        temperature: f32,
    ) -> Result<serde_json::Value> {
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let cache_key = generation_cache_key(&self.config.model, prompt, schema, temperature);
        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::debug!("Cache hit for structured generation");
            self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached);
        }
        self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);

        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(
                "You produce structured data. Respond ONLY with valid JSON matching the schema.",
            ),
            ChatMessage::user(prompt),
        ];

        let content = match self.chat_completion(messages, schema, temperature).await {
            Ok(content) => content,
            Err(e) => {
                self.record_error();
                return Err(e);
            }
        };

        self.metrics
            .total_latency_ms
            .fetch_add(start.elapsed().as_millis() as u64, Ordering::Relaxed);

        let json_str = extract_json_object(&content).ok_or_else(|| {
            self.record_error();
            tracing::debug!("Raw LLM response: {}", content);
            AdaptragError::Llm("LLM response contained no JSON object".to_string())
        })?;

        let value: serde_json::Value = serde_json::from_str(json_str).map_err(|e| {
            self.record_error();
            AdaptragError::Serialization(e)
        })?;

        self.cache.insert(cache_key, value.clone());
        Ok(value)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Extract the outermost JSON object, tolerating code fences and chatter
pub(crate) fn extract_json_object(response: &str) -> Option<&str> {
    let body = if let Some(fenced) = response.split("```json").nth(1) {
        fenced.split("```").next().unwrap_or(fenced)
    } else {
        response
    };

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}
