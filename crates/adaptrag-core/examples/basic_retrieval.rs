// Basic retrieval example using Adaptrag as a library

use adaptrag_core::{AdaptiveRetriever, Chunk, MemoryIndex, Query, RetrievalOptions, UserScope};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    println!("Adaptrag Basic Retrieval Example\n");

    let chunks = vec![
        Chunk::new("refunds", "0", "Our refund policy allows returns within 30 days."),
        Chunk::new("refunds", "1", "Refunds are paid to the original payment method."),
        Chunk::new("shipping", "0", "Standard shipping takes five business days."),
        Chunk::new("warranty", "0", "Hardware carries a two year limited warranty."),
    ];
    let index = MemoryIndex::new(chunks);

    // No generator or reranker: the original query is searched and
    // candidates are ranked by similarity
    let retriever = AdaptiveRetriever::new(Arc::new(index), None, None);
    let query = Query::classified("What is the refund policy?");
    println!("Intent: {:?}", query.intent());

    let result = retriever
        .retrieve(&query, &UserScope::default(), &RetrievalOptions::default())
        .await;

    println!("Strategy: {:?}", result.strategy);
    for scored in &result.final_results {
        println!(
            "{:.3} {} {}",
            scored.final_score,
            scored.candidate.id,
            scored.candidate.content()
        );
    }
    println!(
        "\n{} candidates, {} results in {}ms",
        result.stats.candidate_count, result.stats.final_count, result.stats.total_time_ms
    );
}
