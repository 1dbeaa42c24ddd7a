//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "adaptrag")]
#[command(
    author,
    version,
    about = "Adaptive multi-strategy retrieval and reranking"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, env = "ADAPTRAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Retrieve and rerank chunks for a query
    Query(QueryArgs),

    /// Show which rerank strategy a query would use
    Select(SelectArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct QueryArgs {
    /// Query text
    #[arg(required = true)]
    pub query: Vec<String>,

    /// JSON corpus of chunks to search
    #[arg(long, env = "ADAPTRAG_CORPUS")]
    pub corpus: PathBuf,

    /// Query intent; `auto` classifies from the query text
    #[arg(long, default_value = "auto")]
    pub intent: String,

    /// Number of results
    #[arg(short = 'n')]
    pub limit: Option<usize>,

    /// Minimum relevance score
    #[arg(long)]
    pub min_score: Option<f64>,

    /// Candidate pool size before reranking
    #[arg(long)]
    pub max_candidates: Option<usize>,

    /// Skip LLM query rewriting
    #[arg(long)]
    pub no_rewrite: bool,

    /// Skip hypothetical document generation
    #[arg(long)]
    pub no_hyde: bool,

    /// Skip reranking and rank by search similarity
    #[arg(long)]
    pub no_rerank: bool,

    /// Always use the hybrid strategy
    #[arg(long)]
    pub no_adaptive: bool,

    /// Restrict to these collections
    #[arg(short, long)]
    pub collection: Vec<String>,

    /// Show full chunk content
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct SelectArgs {
    /// Query text used for intent classification
    pub query: Vec<String>,

    /// Query intent; `auto` classifies from the query text
    #[arg(long, default_value = "auto")]
    pub intent: String,

    /// Candidate count to decide for
    #[arg(long)]
    pub candidates: usize,

    /// Always use the hybrid strategy
    #[arg(long)]
    pub no_adaptive: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
