//! `innkeep import-knowledge`: load the guest guide into the knowledge base.

use super::{CommandResult, load_config, open_store};
use innkeep_agent::KnowledgeImporter;
use std::path::Path;

pub async fn run(path: Option<&Path>, guide: &Path, replace: bool) -> CommandResult {
    let config = load_config(path)?;
    let store = open_store(&config).await?;

    let json = std::fs::read_to_string(guide)
        .map_err(|e| format!("Failed to read {}: {e}", guide.display()))?;
    let report = KnowledgeImporter::new(store).import_str(&json, replace).await?;

    println!(
        "Imported {} knowledge entries from {}",
        report.imported,
        guide.display()
    );
    if report.replaced {
        println!("  Previously imported entries were replaced");
    }
    Ok(())
}
