//! `innkeep scan`: run one template scan now.

use super::{CommandResult, build_sender, load_config, open_store, print_json};
use chrono::Utc;
use innkeep_workflow::TemplateEngine;
use std::path::Path;

pub async fn run(path: Option<&Path>) -> CommandResult {
    let config = load_config(path)?;
    let store = open_store(&config).await?;
    let sender = build_sender(&config)?;

    let engine = TemplateEngine::new(store, sender)
        .with_utc_offset_hours(config.scheduler.utc_offset_hours)?;
    let report = engine.run_scan(Utc::now()).await?;
    print_json(&report)
}
