//! `innkeep stats`: per-category draft accuracy.

use super::{CommandResult, load_config, open_store, print_json};
use std::path::Path;

pub async fn run(path: Option<&Path>) -> CommandResult {
    let config = load_config(path)?;
    let store = open_store(&config).await?;

    let rows: Vec<serde_json::Value> = store
        .category_stats()
        .await?
        .iter()
        .map(|stat| {
            serde_json::json!({
                "category": stat.category,
                "total_drafts": stat.total_drafts,
                "sent_unedited": stat.sent_unedited,
                "accuracy": stat.accuracy(),
                "auto_reply_enabled": stat.auto_reply_enabled,
                "never_auto_reply": stat.never_auto_reply,
            })
        })
        .collect();

    if rows.is_empty() {
        println!("No AI drafts recorded yet.");
        return Ok(());
    }
    print_json(&rows)
}
