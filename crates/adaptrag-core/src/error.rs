//! Error types for adaptrag

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type alias using AdaptragError
pub type Result<T> = std::result::Result<T, AdaptragError>;

/// Error type alias for convenience
pub type Error = AdaptragError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for adaptrag
#[derive(Debug, Error)]
pub enum AdaptragError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Rerank error: {0}")]
    Rerank(String),

    #[error("Missing credentials for {0}")]
    MissingCredentials(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AdaptragError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}

/// Pipeline stage that can degrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Rewrite,
    Hyde,
    Search,
    Rerank,
    Pipeline,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Rewrite => "rewrite",
            Stage::Hyde => "hyde",
            Stage::Search => "search",
            Stage::Rerank => "rerank",
            Stage::Pipeline => "pipeline",
        };
        f.write_str(name)
    }
}

/// Why a stage fell back to its degraded output.
///
/// Stages return `Result<T, DegradedReason>`; the caller decides the
/// fallback value and records the reason in the request stats.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DegradedReason {
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("output failed schema validation: {0}")]
    InvalidOutput(String),

    #[error("search failed: {0}")]
    SearchFailed(String),

    #[error("rerank service unavailable: {0}")]
    RerankUnavailable(String),

    #[error("missing credentials for {0}")]
    MissingCredentials(String),

    #[error("{stage} timed out after {after_ms}ms")]
    Timeout { stage: Stage, after_ms: u64 },

    #[error("{stage} cancelled")]
    Cancelled { stage: Stage },

    #[error("pipeline failed: {0}")]
    Pipeline(String),
}

impl DegradedReason {
    /// Classify a collaborator error raised while running `stage`
    pub fn from_error(stage: Stage, err: AdaptragError) -> Self {
        match err {
            AdaptragError::MissingCredentials(what) => Self::MissingCredentials(what),
            AdaptragError::Serialization(e) => Self::InvalidOutput(e.to_string()),
            other => match stage {
                Stage::Rewrite | Stage::Hyde => Self::GenerationFailed(other.to_string()),
                Stage::Search => Self::SearchFailed(other.to_string()),
                Stage::Rerank => Self::RerankUnavailable(other.to_string()),
                Stage::Pipeline => Self::Pipeline(other.to_string()),
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// A degradation recorded for one stage (and surface, for search)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageDegradation {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<String>,
    pub reason: DegradedReason,
}

impl StageDegradation {
    pub fn new(stage: Stage, reason: DegradedReason) -> Self {
        Self {
            stage,
            surface: None,
            reason,
        }
    }

    pub fn for_surface(stage: Stage, surface: impl Into<String>, reason: DegradedReason) -> Self {
        Self {
            stage,
            surface: Some(surface.into()),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_is_preserved() {
        let reason = DegradedReason::from_error(
            Stage::Rerank,
            AdaptragError::MissingCredentials("rerank service".to_string()),
        );
        assert_eq!(
            reason,
            DegradedReason::MissingCredentials("rerank service".to_string())
        );
    }

    #[test]
    fn test_stage_classification() {
        let search = DegradedReason::from_error(Stage::Search, AdaptragError::Search("down".into()));
        assert!(matches!(search, DegradedReason::SearchFailed(_)));

        let hyde = DegradedReason::from_error(Stage::Hyde, AdaptragError::Llm("boom".into()));
        assert!(matches!(hyde, DegradedReason::GenerationFailed(_)));

        let parse_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let rewrite = DegradedReason::from_error(Stage::Rewrite, parse_err.into());
        assert!(matches!(rewrite, DegradedReason::InvalidOutput(_)));
    }

    #[test]
    fn test_timeout_display() {
        let reason = DegradedReason::Timeout {
            stage: Stage::Search,
            after_ms: 5000,
        };
        assert_eq!(reason.to_string(), "search timed out after 5000ms");
    }
}
