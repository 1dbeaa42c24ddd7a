//! Query value and intent classification

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AdaptragError;

/// Coarse classification of what a query is trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Factual,
    Comparative,
    Exploratory,
    Analytical,
    Temporal,
    Causal,
}

impl QueryIntent {
    pub const ALL: [QueryIntent; 6] = [
        QueryIntent::Factual,
        QueryIntent::Comparative,
        QueryIntent::Exploratory,
        QueryIntent::Analytical,
        QueryIntent::Temporal,
        QueryIntent::Causal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::Factual => "factual",
            QueryIntent::Comparative => "comparative",
            QueryIntent::Exploratory => "exploratory",
            QueryIntent::Analytical => "analytical",
            QueryIntent::Temporal => "temporal",
            QueryIntent::Causal => "causal",
        }
    }

    /// Keyword heuristic; `None` means unclassified.
    ///
    /// Cues are checked from most to least specific, so
    /// "why did sales drop compared to 2022" is comparative.
    pub fn classify(text: &str) -> Option<QueryIntent> {
        let lower = format!(" {} ", text.to_lowercase());

        let has_any = |cues: &[&str]| cues.iter().any(|cue| lower.contains(cue));

        if has_any(&COMPARATIVE_CUES) {
            return Some(QueryIntent::Comparative);
        }
        if has_any(&CAUSAL_CUES) {
            return Some(QueryIntent::Causal);
        }
        if has_any(&TEMPORAL_CUES) || contains_year(&lower) {
            return Some(QueryIntent::Temporal);
        }
        if has_any(&ANALYTICAL_CUES) {
            return Some(QueryIntent::Analytical);
        }
        if has_any(&EXPLORATORY_CUES) {
            return Some(QueryIntent::Exploratory);
        }
        if has_any(&FACTUAL_CUES) {
            return Some(QueryIntent::Factual);
        }

        None
    }
}

const COMPARATIVE_CUES: [&str; 7] = [
    "compare",
    "comparison",
    " vs ",
    " vs. ",
    " versus ",
    "difference between",
    "compared to",
];

const CAUSAL_CUES: [&str; 6] = [" why ", "cause", "reason for", "because", "lead to", "leads to"];

const TEMPORAL_CUES: [&str; 7] = [
    " when ",
    "timeline",
    "history of",
    " since ",
    "latest",
    "recent",
    " before ",
];

const ANALYTICAL_CUES: [&str; 6] = [
    "analy",
    "evaluate",
    "impact",
    "pros and cons",
    "trade-off",
    "tradeoff",
];

const EXPLORATORY_CUES: [&str; 6] = [
    "explore",
    "overview",
    "ideas",
    "tell me about",
    "what are some",
    "brainstorm",
];

const FACTUAL_CUES: [&str; 8] = [
    "what is",
    "what's",
    " who ",
    "how many",
    "how much",
    "define",
    " where ",
    "which ",
];

fn contains_year(lower: &str) -> bool {
    lower.split(|c: char| !c.is_ascii_digit()).any(|token| {
        token.len() == 4 && (token.starts_with("19") || token.starts_with("20"))
    })
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryIntent {
    type Err = AdaptragError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryIntent::ALL
            .into_iter()
            .find(|intent| intent.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AdaptragError::InvalidInput(format!("unknown query intent: {}", s)))
    }
}

/// Immutable query for one retrieval request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    text: String,
    intent: Option<QueryIntent>,
}

impl Query {
    /// Unclassified query
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent: None,
        }
    }

    pub fn with_intent(text: impl Into<String>, intent: QueryIntent) -> Self {
        Self {
            text: text.into(),
            intent: Some(intent),
        }
    }

    /// Query classified with [`QueryIntent::classify`]
    pub fn classified(text: impl Into<String>) -> Self {
        let text = text.into();
        let intent = QueryIntent::classify(&text);
        Self { text, intent }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn intent(&self) -> Option<QueryIntent> {
        self.intent
    }
}
