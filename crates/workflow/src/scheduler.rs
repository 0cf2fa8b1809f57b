//! Background loop that runs template scans on a fixed interval.

use crate::engine::TemplateEngine;
use chrono::Utc;
use innkeep_config::SchedulerConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

pub struct TemplateScheduler {
    engine: Arc<TemplateEngine>,
    interval: Duration,
    startup_delay: Duration,
}

impl TemplateScheduler {
    pub fn new(engine: Arc<TemplateEngine>, config: &SchedulerConfig) -> Self {
        Self {
            engine,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            startup_delay: Duration::from_secs(config.startup_delay_secs),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the scan loop.
    ///
    /// Each tick awaits a full scan before the next can start, so scans never
    /// overlap; a slow scan delays the following tick instead of bunching up.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let engine = self.engine.clone();
        let period = self.interval;
        let startup_delay = self.startup_delay;

        tokio::spawn(async move {
            if !startup_delay.is_zero() {
                debug!(delay_secs = startup_delay.as_secs(), "Waiting before first template scan");
                tokio::time::sleep(startup_delay).await;
            }
            info!(interval_secs = period.as_secs(), "Template scheduler started");

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if let Err(e) = engine.run_scan(Utc::now()).await {
                    error!(error = %e, "Template scan failed");
                }
            }
        })
    }
}
