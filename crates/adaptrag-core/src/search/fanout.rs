//! Concurrent candidate search across expansion surfaces

use super::{clamp_unit, Candidate, HybridSearchParams, SearchIndex, SearchSurface, UserScope};
use crate::deadline::with_deadline;
use crate::error::{Stage, StageDegradation};
use futures::future::join_all;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One search call in the fan-out plan
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceQuery {
    pub surface: SearchSurface,
    /// Position among surfaces of the same kind
    pub ordinal: usize,
    pub text: String,
}

impl SurfaceQuery {
    /// Plan in fan-out order: original, rewrites, then HyDE documents
    pub fn plan<R, H>(original: &str, rewrites: R, hyde_documents: H) -> Vec<SurfaceQuery>
    where
        R: IntoIterator,
        R::Item: Into<String>,
        H: IntoIterator,
        H::Item: Into<String>,
    {
        let mut plan = vec![SurfaceQuery {
            surface: SearchSurface::Original,
            ordinal: 0,
            text: original.to_string(),
        }];
        plan.extend(rewrites.into_iter().enumerate().map(|(i, text)| SurfaceQuery {
            surface: SearchSurface::Rewritten,
            ordinal: i,
            text: text.into(),
        }));
        plan.extend(
            hyde_documents
                .into_iter()
                .enumerate()
                .map(|(i, text)| SurfaceQuery {
                    surface: SearchSurface::Hyde,
                    ordinal: i,
                    text: text.into(),
                }),
        );
        plan
    }

    pub fn label(&self) -> String {
        match self.surface {
            SearchSurface::Original => "original".to_string(),
            other => format!("{}[{}]", other, self.ordinal),
        }
    }
}

/// Per-surface candidate budget: `ceil(max_candidates / surfaces)`
pub fn per_surface_budget(max_candidates: usize, surfaces: usize) -> usize {
    if surfaces == 0 {
        return 0;
    }
    max_candidates.div_ceil(surfaces)
}

/// Issue one search per surface concurrently.
///
/// Returns per-surface candidate lists in plan order. A failed, timed-out
/// or cancelled surface contributes an empty list plus a degradation record;
/// siblings are unaffected. HyDE similarities are multiplied by `hyde_weight`.
pub async fn fan_out_search(
    index: &dyn SearchIndex,
    plan: &[SurfaceQuery],
    scope: &UserScope,
    params: &HybridSearchParams,
    hyde_weight: f64,
    timeout: Duration,
    cancel: &CancellationToken,
) -> (Vec<Vec<Candidate>>, Vec<StageDegradation>) {
    let hyde_weight = clamp_unit(hyde_weight);

    let searches = plan.iter().map(|surface_query| async move {
        let outcome = with_deadline(
            Stage::Search,
            timeout,
            cancel,
            index.search(&surface_query.text, scope, params),
        )
        .await;
        (surface_query, outcome)
    });

    let mut per_surface = Vec::with_capacity(plan.len());
    let mut degradations = Vec::new();

    for (surface_query, outcome) in join_all(searches).await {
        match outcome {
            Ok(hits) => {
                let weight = match surface_query.surface {
                    SearchSurface::Hyde => hyde_weight,
                    _ => 1.0,
                };
                let candidates: Vec<Candidate> = hits
                    .into_iter()
                    .take(params.max_results)
                    .map(|hit| {
                        Candidate::new(hit.chunk, hit.similarity * weight, surface_query.surface)
                    })
                    .collect();
                tracing::debug!(
                    surface = %surface_query.label(),
                    candidates = candidates.len(),
                    "Surface search complete"
                );
                per_surface.push(candidates);
            }
            Err(reason) => {
                tracing::warn!(
                    surface = %surface_query.label(),
                    "Surface search degraded: {}",
                    reason
                );
                degradations.push(StageDegradation::for_surface(
                    Stage::Search,
                    surface_query.label(),
                    reason,
                ));
                per_surface.push(Vec::new());
            }
        }
    }

    (per_surface, degradations)
}
