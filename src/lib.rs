//! wifi-curfew -- switch a modem's Wi-Fi off at night and back on in the
//! morning by driving its web admin console in a headless browser.
//!
//! The crate provides the credential loader, the browser session boundary,
//! the admin console interaction sequence, the retrying job runner and the
//! daily scheduler.

pub mod browser;
pub mod config;
pub mod credentials;
pub mod job;
pub mod logging;
pub mod runner;
pub mod scheduler;
pub mod sequence;

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;

use crate::browser::chrome::ChromeDriver;
use crate::config::Config;
use crate::runner::{JobRunner, RunnerSettings};
use crate::scheduler::JobDefaults;

/// Runner wired to the real Chromium driver.
pub fn chrome_runner(config: &Config) -> JobRunner {
    JobRunner::new(Arc::new(ChromeDriver), RunnerSettings::from_config(config))
}

/// Start the wifi-curfew daemon: register the OFF/ON triggers and poll
/// until interrupted.
pub async fn serve(config: Config) -> Result<()> {
    let scheduler = scheduler::Scheduler::from_config(&config.schedule, &Local::now())?;
    for trigger in scheduler.triggers() {
        tracing::info!(schedule = %trigger.name, state = %trigger.state, at = %trigger.at, "Trigger registered");
    }

    let defaults = JobDefaults {
        test_mode: config.schedule.test_mode,
        headless: config.browser.headless,
    };
    let runner = chrome_runner(&config);

    tracing::info!("Scheduler started. Waiting for scheduled jobs.");
    scheduler::run_scheduler_loop(scheduler, runner, defaults, config.schedule.poll_interval())
        .await;

    Ok(())
}
