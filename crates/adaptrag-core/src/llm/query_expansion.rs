//! Query rewriting and hypothetical document (HyDE) generation

use super::StructuredGenerator;
use crate::deadline::with_deadline;
use crate::error::{DegradedReason, Stage, StageDegradation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Hard cap on rewritten queries per request
pub const MAX_REWRITES: usize = 5;

/// Hard cap on hypothetical documents per request
pub const MAX_HYDE_DOCUMENTS: usize = 3;

/// Hard cap on semantic expansion terms
pub const MAX_EXPANSION_TERMS: usize = 8;

const REWRITE_TEMPERATURE: f32 = 0.3;
const HYDE_TEMPERATURE: f32 = 0.4;

/// A paraphrase of the original query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewrittenQuery {
    pub query: String,
    /// What the rewrite emphasizes, e.g. "synonyms" or "broader context"
    pub focus: String,
    pub reasoning: String,
}

/// A generated passage that plausibly answers the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypotheticalDocument {
    pub content: String,
    pub document_type: String,
    /// Model confidence in [0, 1]
    pub confidence: f64,
}

/// Rewrites plus the expansion terms produced alongside them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewriteSet {
    pub rewrites: Vec<RewrittenQuery>,
    pub expansion_terms: Vec<String>,
}

/// Search surfaces derived from one query. Empty means single-query retrieval.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryExpansion {
    pub rewritten_queries: Vec<RewrittenQuery>,
    pub hypothetical_documents: Vec<HypotheticalDocument>,
    pub expansion_terms: Vec<String>,
}

impl QueryExpansion {
    pub fn is_empty(&self) -> bool {
        self.rewritten_queries.is_empty() && self.hypothetical_documents.is_empty()
    }
}

/// How much expansion to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionRequest {
    /// 0 disables rewriting
    pub max_rewrites: usize,
    /// 0 disables HyDE
    pub max_hyde_documents: usize,
}

/// Generates query expansions through a structured-generation service
pub struct QueryExpansionGenerator {
    generator: Arc<dyn StructuredGenerator>,
}

impl QueryExpansionGenerator {
    pub fn new(generator: Arc<dyn StructuredGenerator>) -> Self {
        Self { generator }
    }

    /// Generate up to `max_rewrites` paraphrases and expansion terms
    pub async fn generate_rewrites(
        &self,
        query: &str,
        max_rewrites: usize,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RewriteSet, DegradedReason> {
        let max_rewrites = max_rewrites.min(MAX_REWRITES);
        if max_rewrites == 0 {
            return Ok(RewriteSet::default());
        }

        let prompt = build_rewrite_prompt(query, max_rewrites);
        let schema = rewrite_schema(max_rewrites);
        let value = with_deadline(
            Stage::Rewrite,
            timeout,
            cancel,
            self.generator
                .generate_structured(&prompt, &schema, REWRITE_TEMPERATURE),
        )
        .await?;

        parse_rewrites(value, query, max_rewrites)
    }

    /// Generate up to `max_documents` hypothetical answer passages
    pub async fn generate_hyde(
        &self,
        query: &str,
        max_documents: usize,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<HypotheticalDocument>, DegradedReason> {
        let max_documents = max_documents.min(MAX_HYDE_DOCUMENTS);
        if max_documents == 0 {
            return Ok(Vec::new());
        }

        let prompt = build_hyde_prompt(query, max_documents);
        let schema = hyde_schema(max_documents);
        let value = with_deadline(
            Stage::Hyde,
            timeout,
            cancel,
            self.generator
                .generate_structured(&prompt, &schema, HYDE_TEMPERATURE),
        )
        .await?;

        parse_hyde_documents(value, max_documents)
    }

    /// Run rewriting and HyDE concurrently.
    ///
    /// Never fails: a degraded half contributes nothing and is reported
    /// in the returned degradations.
    pub async fn expand(
        &self,
        query: &str,
        request: ExpansionRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> (QueryExpansion, Vec<StageDegradation>) {
        let (rewrites, hyde) = tokio::join!(
            self.generate_rewrites(query, request.max_rewrites, timeout, cancel),
            self.generate_hyde(query, request.max_hyde_documents, timeout, cancel),
        );

        let mut expansion = QueryExpansion::default();
        let mut degradations = Vec::new();

        match rewrites {
            Ok(set) => {
                expansion.rewritten_queries = set.rewrites;
                expansion.expansion_terms = set.expansion_terms;
            }
            Err(reason) => {
                tracing::warn!(stage = %Stage::Rewrite, "Query rewriting degraded: {}", reason);
                degradations.push(StageDegradation::new(Stage::Rewrite, reason));
            }
        }

        match hyde {
            Ok(documents) => expansion.hypothetical_documents = documents,
            Err(reason) => {
                tracing::warn!(stage = %Stage::Hyde, "HyDE generation degraded: {}", reason);
                degradations.push(StageDegradation::new(Stage::Hyde, reason));
            }
        }

        tracing::debug!(
            rewrites = expansion.rewritten_queries.len(),
            hyde_documents = expansion.hypothetical_documents.len(),
            terms = expansion.expansion_terms.len(),
            model = self.generator.model_name(),
            "Query expansion complete"
        );

        (expansion, degradations)
    }
}

fn build_rewrite_prompt(query: &str, max_rewrites: usize) -> String {
    format!(
        r#"Rewrite this search query to improve document retrieval recall.

Query: "{}"

Produce up to {} rewritten queries. Each rewrite must keep the original meaning
but take a different angle. Label each with a short "focus" such as
"synonyms", "specificity", "broader context" or "technical terms", and give a
one-sentence "reasoning".

Also list up to {} "expansion_terms": single words or short phrases that
relevant documents are likely to contain.

Output JSON:
{{"rewrites": [{{"query": "...", "focus": "...", "reasoning": "..."}}], "expansion_terms": ["..."]}}"#,
        query, max_rewrites, MAX_EXPANSION_TERMS
    )
}

fn build_hyde_prompt(query: &str, max_documents: usize) -> String {
    format!(
        r#"Write {} short passages (100-200 words each) that would directly answer
this question if they appeared in a knowledge base.

Question: "{}"

For each passage give a "document_type" (for example "technical_doc", "faq",
"article", "patent", "research_paper") and a "confidence" between 0 and 1
that a real document like it exists.

Output JSON:
{{"documents": [{{"content": "...", "document_type": "...", "confidence": 0.0}}]}}"#,
        max_documents, query
    )
}

fn rewrite_schema(max_rewrites: usize) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "rewrites": {
                "type": "array",
                "maxItems": max_rewrites,
                "items": {
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "focus": { "type": "string" },
                        "reasoning": { "type": "string" }
                    },
                    "required": ["query", "focus", "reasoning"]
                }
            },
            "expansion_terms": {
                "type": "array",
                "maxItems": MAX_EXPANSION_TERMS,
                "items": { "type": "string" }
            }
        },
        "required": ["rewrites"]
    })
}

fn hyde_schema(max_documents: usize) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "documents": {
                "type": "array",
                "maxItems": max_documents,
                "items": {
                    "type": "object",
                    "properties": {
                        "content": { "type": "string" },
                        "document_type": { "type": "string" },
                        "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
                    },
                    "required": ["content", "document_type", "confidence"]
                }
            }
        },
        "required": ["documents"]
    })
}

#[derive(Deserialize)]
struct RawRewrites {
    rewrites: Vec<RewrittenQuery>,
    #[serde(default)]
    expansion_terms: Vec<String>,
}

#[derive(Deserialize)]
struct RawHyde {
    documents: Vec<HypotheticalDocument>,
}

fn parse_rewrites(
    value: serde_json::Value,
    original: &str,
    max_rewrites: usize,
) -> Result<RewriteSet, DegradedReason> {
    let raw: RawRewrites =
        serde_json::from_value(value).map_err(|e| DegradedReason::InvalidOutput(e.to_string()))?;

    let original_key = original.trim().to_lowercase();
    let mut seen = HashSet::new();
    let mut rewrites = Vec::new();

    for mut rewrite in raw.rewrites {
        rewrite.query = rewrite.query.trim().to_string();
        if rewrite.query.is_empty() {
            return Err(DegradedReason::InvalidOutput(
                "rewrite with empty query".to_string(),
            ));
        }
        let key = rewrite.query.to_lowercase();
        // Rewrites equal to the original add no new surface
        if key == original_key || !seen.insert(key) {
            continue;
        }
        rewrites.push(rewrite);
        if rewrites.len() == max_rewrites {
            break;
        }
    }

    let mut seen_terms = HashSet::new();
    let expansion_terms = raw
        .expansion_terms
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen_terms.insert(t.to_lowercase()))
        .take(MAX_EXPANSION_TERMS)
        .collect();

    Ok(RewriteSet {
        rewrites,
        expansion_terms,
    })
}

fn parse_hyde_documents(
    value: serde_json::Value,
    max_documents: usize,
) -> Result<Vec<HypotheticalDocument>, DegradedReason> {
    let raw: RawHyde =
        serde_json::from_value(value).map_err(|e| DegradedReason::InvalidOutput(e.to_string()))?;

    let mut documents = Vec::new();
    for mut doc in raw.documents.into_iter().take(max_documents) {
        doc.content = doc.content.trim().to_string();
        if doc.content.is_empty() {
            return Err(DegradedReason::InvalidOutput(
                "hypothetical document with empty content".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&doc.confidence) {
            return Err(DegradedReason::InvalidOutput(format!(
                "confidence {} outside [0, 1]",
                doc.confidence
            )));
        }
        documents.push(doc);
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AdaptragError, Result};
    use async_trait::async_trait;
    use serde_json::json;

    /// Answers rewrite prompts and HyDE prompts with canned values
    struct CannedGenerator {
        rewrites: Option<serde_json::Value>,
        hyde: Option<serde_json::Value>,
    }

    #[async_trait]
    impl StructuredGenerator for CannedGenerator {
        async fn generate_structured(
            &self,
            _prompt: &str,
            schema: &serde_json::Value,
            _temperature: f32,
        ) -> Result<serde_json::Value> {
            let canned = if schema["properties"].get("documents").is_some() {
                &self.hyde
            } else {
                &self.rewrites
            };
            canned
                .clone()
                .ok_or_else(|| AdaptragError::Llm("service unavailable".to_string()))
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn rewrites_json() -> serde_json::Value {
        json!({
            "rewrites": [
                {"query": "refund policy terms", "focus": "specificity", "reasoning": "narrow"},
                {"query": "What is the refund policy?", "focus": "echo", "reasoning": "same"},
                {"query": "money back guarantee", "focus": "synonyms", "reasoning": "wording"},
                {"query": "REFUND POLICY TERMS", "focus": "dup", "reasoning": "dup"}
            ],
            "expansion_terms": ["refund", "Refund", " returns ", ""]
        })
    }

    fn hyde_json() -> serde_json::Value {
        json!({
            "documents": [
                {"content": "Refunds are issued within 30 days.", "document_type": "faq", "confidence": 0.8}
            ]
        })
    }

    #[test]
    fn test_parse_rewrites_filters_echo_and_duplicates() {
        let set = parse_rewrites(rewrites_json(), "What is the refund policy?", 5).unwrap();
        let queries: Vec<&str> = set.rewrites.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["refund policy terms", "money back guarantee"]);
        assert_eq!(set.expansion_terms, vec!["refund", "returns"]);
    }

    #[test]
    fn test_parse_rewrites_respects_max() {
        let set = parse_rewrites(rewrites_json(), "q", 1).unwrap();
        assert_eq!(set.rewrites.len(), 1);
    }

    #[test]
    fn test_parse_rejects_schema_violations() {
        let missing_focus = json!({"rewrites": [{"query": "x", "reasoning": "y"}]});
        assert!(matches!(
            parse_rewrites(missing_focus, "q", 3),
            Err(DegradedReason::InvalidOutput(_))
        ));

        let bad_confidence = json!({
            "documents": [{"content": "x", "document_type": "faq", "confidence": 1.5}]
        });
        assert!(matches!(
            parse_hyde_documents(bad_confidence, 3),
            Err(DegradedReason::InvalidOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_expand_combines_both_halves() {
        let generator = QueryExpansionGenerator::new(Arc::new(CannedGenerator {
            rewrites: Some(rewrites_json()),
            hyde: Some(hyde_json()),
        }));
        let (expansion, degradations) = generator
            .expand(
                "What is the refund policy?",
                ExpansionRequest {
                    max_rewrites: 3,
                    max_hyde_documents: 1,
                },
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await;

        assert!(degradations.is_empty());
        assert_eq!(expansion.rewritten_queries.len(), 2);
        assert_eq!(expansion.hypothetical_documents.len(), 1);
        assert_eq!(expansion.hypothetical_documents[0].document_type, "faq");
    }

    #[tokio::test]
    async fn test_expand_degrades_to_empty_on_failure() {
        let generator = QueryExpansionGenerator::new(Arc::new(CannedGenerator {
            rewrites: None,
            hyde: None,
        }));
        let (expansion, degradations) = generator
            .expand(
                "q",
                ExpansionRequest {
                    max_rewrites: 3,
                    max_hyde_documents: 2,
                },
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await;

        assert!(expansion.is_empty());
        assert!(expansion.expansion_terms.is_empty());
        let stages: Vec<Stage> = degradations.iter().map(|d| d.stage).collect();
        assert_eq!(stages, vec![Stage::Rewrite, Stage::Hyde]);
        assert!(matches!(
            degradations[0].reason,
            DegradedReason::GenerationFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_disabled_halves_make_no_calls() {
        let generator = QueryExpansionGenerator::new(Arc::new(CannedGenerator {
            rewrites: None,
            hyde: None,
        }));
        let (expansion, degradations) = generator
            .expand(
                "q",
                ExpansionRequest {
                    max_rewrites: 0,
                    max_hyde_documents: 0,
                },
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await;
        assert!(expansion.is_empty());
        assert!(degradations.is_empty());
    }
}
