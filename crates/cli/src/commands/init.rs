//! `innkeep init`: write a default config file.

use super::{CommandResult, config_path};
use innkeep_config::AppConfig;
use std::path::Path;

pub async fn run(path: Option<&Path>, force: bool) -> CommandResult {
    let path = config_path(path);

    if path.exists() && !force {
        println!("Config already exists at {} (use --force to overwrite)", path.display());
        return Ok(());
    }

    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;

    println!("Wrote default config to {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. export INNKEEP_LLM_API_KEY=...   (or GEMINI_API_KEY)");
    println!("  2. export HOSTTOOLS_AUTH_TOKEN=...");
    println!("  3. innkeep import-knowledge guide.json");
    println!("  4. innkeep daemon");
    Ok(())
}
