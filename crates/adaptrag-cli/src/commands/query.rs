//! Retrieval command

use super::resolve_intent;
use crate::app::{OutputFormat, QueryArgs};
use crate::output::{format_retrieval, FormatOptions};
use adaptrag_core::llm::{HttpReranker, Reranker, StructuredGenerator, VLLMClient};
use adaptrag_core::rerank::{default_strategy_configs, StrategyParams};
use adaptrag_core::{AdaptiveRetriever, Config, MemoryIndex, Query, RetrievalOptions, UserScope};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(args: QueryArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let text = args.query.join(" ");
    let intent = resolve_intent(&args.intent, &text)?;
    let query = match intent {
        Some(intent) => Query::with_intent(text, intent),
        None => Query::new(text),
    };
    let options = build_options(&args, &config.retrieval)?;

    let index = MemoryIndex::from_json_file(&args.corpus)
        .with_context(|| format!("Failed to load corpus {}", args.corpus.display()))?;
    tracing::info!("Loaded {} chunks from {}", index.len(), args.corpus.display());

    let generator: Option<Arc<dyn StructuredGenerator>> =
        if options.use_query_rewriting || options.use_hyde {
            Some(Arc::new(VLLMClient::new(config.llm_service.clone())?))
        } else {
            None
        };

    let reranker = HttpReranker::from_config(config.rerank_service.clone())?;
    let reranker: Option<Arc<dyn Reranker>> = if reranker.has_credentials() {
        Some(Arc::new(reranker))
    } else {
        tracing::debug!("No rerank API key configured; cross-encoder will degrade");
        None
    };

    let mut strategy_configs = default_strategy_configs();
    for entry in &mut strategy_configs {
        if let StrategyParams::CrossEncoder { .. } = entry.params {
            entry.params = StrategyParams::CrossEncoder {
                max_documents: config.rerank_service.max_documents,
                max_document_chars: config.rerank_service.max_document_chars,
            };
        }
    }

    let retriever = AdaptiveRetriever::new(Arc::new(index), generator, reranker)
        .with_strategy_configs(strategy_configs);
    let scope = UserScope {
        user_id: None,
        collections: args.collection.clone(),
    };

    // Ctrl-C cancels in-flight work and still prints what the pipeline reports
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let result = retriever
        .retrieve_with_cancel(&query, &scope, &options, cancel)
        .await;

    let format_opts = FormatOptions { full: args.full };
    print!("{}", format_retrieval(&result, format, &format_opts));
    Ok(())
}

fn build_options(args: &QueryArgs, defaults: &RetrievalOptions) -> Result<RetrievalOptions> {
    let mut options = defaults.clone();
    if args.no_rewrite {
        options.use_query_rewriting = false;
    }
    if args.no_hyde {
        options.use_hyde = false;
    }
    if args.no_rerank {
        options.use_reranking = false;
    }
    if args.no_adaptive {
        options.adaptive_strategy = false;
    }
    if let Some(limit) = args.limit {
        options.final_result_count = limit;
    }
    if let Some(min_score) = args.min_score {
        options.min_relevance_score = min_score;
    }
    if let Some(max_candidates) = args.max_candidates {
        options.max_candidates = max_candidates;
    }
    options.validate()?;
    Ok(options)
}
