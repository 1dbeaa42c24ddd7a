//! Lexical text similarity used for diversity, metrics and the in-memory index

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"[\p{L}\p{N}]+").expect("token regex is valid");
}

/// Common English stop words ignored when matching query terms
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "he", "in",
    "is", "it", "its", "of", "on", "that", "the", "to", "was", "will", "with", "does", "do",
    "did", "can", "could", "should", "would", "what", "where", "when", "why", "how", "who",
    "which", "this", "these", "those", "there", "here",
];

/// Lowercased word tokens in order of appearance
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Distinct lowercased tokens
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Distinct tokens with stop words removed
pub fn content_terms(text: &str) -> HashSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Jaccard similarity over token sets, in [0, 1]. Empty sets score 0.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Jaccard similarity between two strings
pub fn text_similarity(a: &str, b: &str) -> f64 {
    jaccard(&token_set(a), &token_set(b))
}

/// Fraction of query terms present in the document, in [0, 1]
pub fn term_overlap(query_terms: &HashSet<String>, doc_terms: &HashSet<String>) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let hits = query_terms.iter().filter(|t| doc_terms.contains(*t)).count();
    hits as f64 / query_terms.len() as f64
}

/// Mean pairwise Jaccard similarity across texts; 0 for fewer than two
pub fn mean_pairwise_similarity<S: AsRef<str>>(texts: &[S]) -> f64 {
    if texts.len() < 2 {
        return 0.0;
    }
    let sets: Vec<HashSet<String>> = texts.iter().map(|t| token_set(t.as_ref())).collect();

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            total += jaccard(&sets[i], &sets[j]);
            pairs += 1;
        }
    }

    total / pairs as f64
}
