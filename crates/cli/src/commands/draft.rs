//! `innkeep draft`: generate a draft reply.

use super::{CommandResult, build_provider, load_config, open_store, print_json};
use innkeep_agent::DraftEngine;
use std::path::Path;

pub async fn run(path: Option<&Path>, reservation_id: i64) -> CommandResult {
    let config = load_config(path)?;
    let store = open_store(&config).await?;
    let provider = build_provider(&config)?;

    let engine = DraftEngine::from_config(store, provider, &config.llm)
        .with_utc_offset_hours(config.scheduler.utc_offset_hours)?;
    let draft = engine.generate_draft(reservation_id).await?;
    print_json(&draft)
}
