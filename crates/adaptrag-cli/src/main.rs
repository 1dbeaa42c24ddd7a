//! Adaptrag CLI
//!
//! Adaptive multi-strategy retrieval over a local corpus.

use adaptrag_core::error::exit_codes;
use adaptrag_core::{AdaptragError, Config};
use anyhow::Result;
use clap::Parser;

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<AdaptragError>()
            .map(AdaptragError::exit_code)
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_from(&config_path)?;

    match cli.command {
        Commands::Query(args) => commands::query::run(args, &config, cli.format).await,
        Commands::Select(args) => commands::select::run(args, &config, cli.format),
        Commands::Config(args) => commands::config::run(args, &config, &config_path, cli.format),
    }
}
