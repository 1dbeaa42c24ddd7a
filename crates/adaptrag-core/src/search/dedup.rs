//! Candidate deduplication by chunk identity

use super::{Candidate, ChunkId};
use std::collections::HashSet;

/// Merge per-surface lists in fan-out order, keeping the first occurrence
/// of each chunk identity (and its surface tag and similarity), then
/// truncate to `max_candidates`.
pub fn deduplicate(per_surface: Vec<Vec<Candidate>>, max_candidates: usize) -> Vec<Candidate> {
    let mut seen: HashSet<ChunkId> = HashSet::new();

    per_surface
        .into_iter()
        .flatten()
        .filter(|candidate| seen.insert(candidate.id.clone()))
        .take(max_candidates)
        .collect()
}
