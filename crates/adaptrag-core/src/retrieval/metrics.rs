//! Diagnostic quality metrics over the final result set

use crate::rerank::ScoredCandidate;
use crate::search::text::mean_pairwise_similarity;
use serde::Serialize;

/// Results at which coverage saturates
const COVERAGE_SATURATION: usize = 5;

/// Depth used for top-k precision
const PRECISION_DEPTH: usize = 5;

/// Relevance above which a result counts as precise
const PRECISION_THRESHOLD: f64 = 0.5;

/// Observability-only metrics; never used to alter results
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub average_relevance: f64,
    /// 1 − mean pairwise lexical similarity
    pub diversity: f64,
    /// `min(1, count / 5)`
    pub coverage: f64,
    /// Fraction of the top 5 with relevance above 0.5
    pub precision: f64,
}

impl QualityMetrics {
    pub fn compute(results: &[ScoredCandidate]) -> Self {
        if results.is_empty() {
            return Self::default();
        }

        let n = results.len() as f64;
        let average_relevance = results.iter().map(|s| s.final_score).sum::<f64>() / n;

        let contents: Vec<&str> = results.iter().map(|s| s.candidate.content()).collect();
        let diversity = if results.len() == 1 {
            1.0
        } else {
            (1.0 - mean_pairwise_similarity(&contents)).clamp(0.0, 1.0)
        };

        let coverage = (n / COVERAGE_SATURATION as f64).min(1.0);

        let top = &results[..results.len().min(PRECISION_DEPTH)];
        let precise = top
            .iter()
            .filter(|s| s.final_score > PRECISION_THRESHOLD)
            .count();
        let precision = precise as f64 / top.len() as f64;

        Self {
            average_relevance,
            diversity,
            coverage,
            precision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rerank::RerankStrategy;
    use crate::search::{Candidate, Chunk, SearchSurface};

    fn scored(id: &str, content: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate::new(
            Candidate::new(Chunk::new(id, "0", content), score, SearchSurface::Original),
            RerankStrategy::Cohere,
            score,
        )
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(QualityMetrics::compute(&[]), QualityMetrics::default());
    }

    #[test]
    fn test_single_result_is_fully_diverse() {
        let metrics = QualityMetrics::compute(&[scored("a", "refund policy", 0.8)]);
        assert_eq!(metrics.diversity, 1.0);
        assert!((metrics.coverage - 0.2).abs() < 1e-9);
        assert_eq!(metrics.precision, 1.0);
        assert!((metrics.average_relevance - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_identical_content_has_no_diversity() {
        let results = vec![
            scored("a", "refund policy terms", 0.9),
            scored("b", "refund policy terms", 0.4),
        ];
        let metrics = QualityMetrics::compute(&results);
        assert!(metrics.diversity.abs() < 1e-9);
        assert_eq!(metrics.precision, 0.5);
    }

    #[test]
    fn test_precision_only_counts_top_five() {
        let mut results: Vec<ScoredCandidate> = (0..5)
            .map(|i| scored(&format!("hi{}", i), &format!("topic{}", i), 0.9))
            .collect();
        results.extend((0..3).map(|i| scored(&format!("lo{}", i), &format!("other{}", i), 0.35)));
        let metrics = QualityMetrics::compute(&results);
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.coverage, 1.0);
    }
}
