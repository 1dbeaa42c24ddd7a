//! Strategy selection command

use super::resolve_intent;
use crate::app::{OutputFormat, SelectArgs};
use crate::output::format_selection;
use adaptrag_core::rerank::select;
use adaptrag_core::Config;
use anyhow::Result;

pub fn run(args: SelectArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let text = args.query.join(" ");
    let intent = resolve_intent(&args.intent, &text)?;
    let adaptive = config.retrieval.adaptive_strategy && !args.no_adaptive;

    let selection = select(intent, args.candidates, adaptive);
    print!(
        "{}",
        format_selection(intent, args.candidates, &selection, format)
    );
    Ok(())
}
