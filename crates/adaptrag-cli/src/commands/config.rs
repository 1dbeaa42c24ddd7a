//! Configuration commands

use crate::app::{ConfigAction, ConfigArgs, OutputFormat};
use adaptrag_core::Config;
use anyhow::Result;
use std::path::Path;

const REDACTED: &str = "********";

pub fn run(args: ConfigArgs, config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
    match args.action {
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Show => {
            let redacted = redact(config);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&redacted)?),
                OutputFormat::Cli => print!("{}", serde_yaml::to_string(&redacted)?),
            }
        }
    }
    Ok(())
}

fn redact(config: &Config) -> Config {
    let mut config = config.clone();
    if config.llm_service.api_key.is_some() {
        config.llm_service.api_key = Some(REDACTED.to_string());
    }
    if config.rerank_service.api_key.is_some() {
        config.rerank_service.api_key = Some(REDACTED.to_string());
    }
    config
}
