//! Configuration management

use crate::error::Result;
use crate::retrieval::RetrievalOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM service used for query rewriting and HyDE generation
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Cross-encoder relevance scoring service
    #[serde(default)]
    pub rerank_service: RerankServiceConfig,

    /// Default retrieval options for every request
    #[serde(default)]
    pub retrieval: RetrievalOptions,
}

/// LLM service configuration for structured generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of an OpenAI-compatible chat completions service
    pub url: String,

    /// Model name for structured generation
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Transport-level request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on generated tokens per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("ADAPTRAG_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_chat_model(),
            api_key: std::env::var("ADAPTRAG_LLM_API_KEY").ok(),
            timeout_secs: default_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Cross-encoder (Cohere-compatible) rerank service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankServiceConfig {
    /// Base URL of the rerank API
    pub url: String,

    /// Rerank model name
    #[serde(default = "default_rerank_model")]
    pub model: String,

    /// API key; without one the cross-encoder degrades to similarity order
    #[serde(default)]
    pub api_key: Option<String>,

    /// Transport-level request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum documents sent per rerank call
    #[serde(default = "default_max_rerank_documents")]
    pub max_documents: usize,

    /// Per-document character budget
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
}

impl Default for RerankServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("ADAPTRAG_RERANK_URL")
                .unwrap_or_else(|_| "https://api.cohere.com".to_string()),
            model: default_rerank_model(),
            api_key: std::env::var("ADAPTRAG_RERANK_API_KEY")
                .or_else(|_| std::env::var("COHERE_API_KEY"))
                .ok(),
            timeout_secs: default_timeout(),
            max_documents: default_max_rerank_documents(),
            max_document_chars: default_max_document_chars(),
        }
    }
}

fn default_chat_model() -> String {
    std::env::var("ADAPTRAG_LLM_MODEL")
        .unwrap_or_else(|_| "meta-llama/Llama-3.1-8B-Instruct".to_string())
}

fn default_rerank_model() -> String {
    std::env::var("ADAPTRAG_RERANK_MODEL").unwrap_or_else(|_| "rerank-english-v3.0".to_string())
}

fn default_timeout() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_max_rerank_documents() -> usize {
    50
}

fn default_max_document_chars() -> usize {
    800
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from a specific path, falling back to defaults when absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            config.retrieval.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }
}
