//! `innkeep detect-templates`: flag repeated host messages.

use super::{CommandResult, load_config, open_store};
use innkeep_agent::TemplateDetector;
use std::path::Path;

pub async fn run(path: Option<&Path>, min_occurrences: usize) -> CommandResult {
    let config = load_config(path)?;
    let store = open_store(&config).await?;

    let report = TemplateDetector::new(store)
        .with_min_occurrences(min_occurrences)
        .detect_and_flag()
        .await?;

    println!("Host messages scanned:  {}", report.host_messages);
    println!("Template groups found:  {}", report.template_groups);
    println!("Messages flagged:       {}", report.flagged);
    Ok(())
}
