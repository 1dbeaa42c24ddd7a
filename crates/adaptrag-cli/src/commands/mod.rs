//! CLI command implementations

pub mod config;
pub mod query;
pub mod select;

use adaptrag_core::QueryIntent;
use anyhow::Result;

/// Resolve an `--intent` argument: `auto` classifies, `none` leaves the
/// query unclassified, anything else must name an intent
pub fn resolve_intent(arg: &str, query: &str) -> Result<Option<QueryIntent>> {
    match arg.trim().to_lowercase().as_str() {
        "auto" => Ok(QueryIntent::classify(query)),
        "none" | "unclassified" => Ok(None),
        other => Ok(Some(other.parse()?)),
    }
}
