//! Reranking performance benchmarks
//!
//! Measures performance of:
//! - MMR diversity selection
//! - Hybrid score combination
//! - Quality metrics over a final result set
//! - In-memory index search

use adaptrag_core::rerank::{
    mmr_select, semantic_passthrough, CrossEncoderStrategy, HybridCombiner, HybridWeights,
};
use adaptrag_core::search::HybridSearchParams;
use adaptrag_core::{Candidate, Chunk, MemoryIndex, QualityMetrics, SearchIndex, SearchSurface, UserScope};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TOPICS: &[&str] = &[
    "refund policy returns within thirty days of purchase",
    "shipping times for international orders and customs",
    "warranty coverage for hardware defects and repairs",
    "account security with two factor authentication",
    "subscription billing cycles and proration rules",
    "data export formats for analytics dashboards",
];

fn make_candidates(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| {
            let content = format!("{} section {} revision {}", TOPICS[i % TOPICS.len()], i, i % 7);
            Candidate::new(
                Chunk::new(format!("doc{}", i), "0", content),
                1.0 - i as f64 / (n as f64 + 1.0),
                SearchSurface::Original,
            )
        })
        .collect()
}

fn bench_mmr(c: &mut Criterion) {
    let mut group = c.benchmark_group("mmr_select");
    for size in [10, 30, 50] {
        let candidates = make_candidates(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &candidates, |b, candidates| {
            b.iter(|| mmr_select(black_box(candidates), 0.3))
        });
    }
    group.finish();
}

fn bench_hybrid(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let combiner = HybridCombiner::new(
        CrossEncoderStrategy::new(None, 50, 800),
        0.3,
        HybridWeights::default(),
    );
    let candidates = make_candidates(30);
    let cancel = CancellationToken::new();

    c.bench_function("hybrid_combine_30", |b| {
        b.iter(|| {
            runtime.block_on(combiner.combine(
                "refund policy",
                black_box(&candidates),
                Duration::from_secs(1),
                &cancel,
            ))
        })
    });
}

fn bench_metrics(c: &mut Criterion) {
    let scored = semantic_passthrough(&make_candidates(10));
    c.bench_function("quality_metrics_10", |b| {
        b.iter(|| QualityMetrics::compute(black_box(&scored)))
    });
}

fn bench_memory_index(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let chunks: Vec<Chunk> = make_candidates(500).into_iter().map(|c| c.chunk).collect();
    let index = MemoryIndex::new(chunks);
    let scope = UserScope::default();
    let params = HybridSearchParams::default();

    c.bench_function("memory_index_search_500", |b| {
        b.iter(|| {
            runtime.block_on(index.search(black_box("refund returns policy"), &scope, &params))
        })
    });
}

criterion_group!(benches, bench_mmr, bench_hybrid, bench_metrics, bench_memory_index);
criterion_main!(benches);
