//! `innkeep daemon`: run the template scheduler.

use super::{CommandResult, build_sender, load_config, open_store};
use innkeep_workflow::{TemplateEngine, TemplateScheduler};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(path: Option<&Path>) -> CommandResult {
    let config = load_config(path)?;

    if !config.scheduler.enabled {
        warn!("scheduler.enabled is false; nothing to run");
        return Ok(());
    }

    let store = open_store(&config).await?;
    let sender = build_sender(&config)?;
    let engine = TemplateEngine::new(store, sender)
        .with_utc_offset_hours(config.scheduler.utc_offset_hours)?;
    let engine = Arc::new(engine);

    let scheduler = TemplateScheduler::new(engine, &config.scheduler);
    let handle = scheduler.start();
    info!(
        interval_secs = config.scheduler.interval_secs,
        startup_delay_secs = config.scheduler.startup_delay_secs,
        utc_offset_hours = config.scheduler.utc_offset_hours,
        "innkeep daemon running (Ctrl+C to stop)"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.abort();
    Ok(())
}
