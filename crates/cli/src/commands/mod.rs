pub mod daemon;
pub mod detect;
pub mod draft;
pub mod init;
pub mod knowledge;
pub mod scan;
pub mod send;
pub mod stats;

use innkeep_config::AppConfig;
use innkeep_core::channel::MessageSender;
use innkeep_core::provider::Provider;
use innkeep_core::store::Store;
use innkeep_storage::SqliteStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// The config file a command reads: `--config` or the default location.
pub fn config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load, override from the environment, and validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load_from(&config_path(path))
        .map_err(|e| format!("Failed to load config: {e}"))?;
    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    let store = SqliteStore::new(&config.database_url)
        .await
        .map_err(|e| format!("Failed to open database {}: {e}", config.database_url))?;
    Ok(Arc::new(store))
}

pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, Box<dyn std::error::Error>> {
    Ok(innkeep_providers::build_from_config(&config.llm)?)
}

pub fn build_sender(
    config: &AppConfig,
) -> Result<Arc<dyn MessageSender>, Box<dyn std::error::Error>> {
    Ok(Arc::new(innkeep_channels::HostToolsClient::from_config(&config.hosttools)?))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
