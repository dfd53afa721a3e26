use chrono::{DateTime, Local, TimeZone};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::job::Job;
use crate::runner::JobRunner;
use crate::scheduler::Scheduler;

/// Flags stamped onto every job a trigger creates.
#[derive(Debug, Clone, Copy)]
pub struct JobDefaults {
    pub test_mode: bool,
    pub headless: bool,
}

/// Run every trigger due at `now`, one after the other, each to completion.
/// Returns how many jobs were run.
pub async fn run_pending<Tz: TimeZone>(
    scheduler: &mut Scheduler<Tz>,
    runner: &JobRunner,
    defaults: JobDefaults,
    now: &DateTime<Tz>,
) -> usize {
    let mut ran = 0;
    while let Some(trigger) = scheduler.take_due(now) {
        info!(schedule = %trigger.name, state = %trigger.state, "Task due");
        let job = Job::new(trigger.state)
            .with_test_mode(defaults.test_mode)
            .with_headless(defaults.headless);

        match runner.run(&job).await {
            Ok(report) => info!(
                schedule = %trigger.name,
                attempts = report.attempts,
                outcome = %report.outcome,
                "Job finished"
            ),
            Err(e) => error!(schedule = %trigger.name, "Job failed: {}", e),
        }
        ran += 1;
    }
    ran
}

/// Main scheduler loop on the local wall clock.
///
/// Polls every `poll` and runs due jobs inline, so a long job delays the
/// next poll. Returns on Ctrl-C; an in-flight job is dropped, which kills
/// its browser.
pub async fn run_scheduler_loop(
    scheduler: Scheduler<Local>,
    runner: JobRunner,
    defaults: JobDefaults,
    poll: Duration,
) {
    poll_until(
        scheduler,
        &runner,
        defaults,
        poll,
        Local::now,
        tokio::signal::ctrl_c(),
    )
    .await;
}

/// Poll `scheduler` against `clock` every `poll` until `shutdown` resolves.
pub async fn poll_until<Tz, C, S>(
    mut scheduler: Scheduler<Tz>,
    runner: &JobRunner,
    defaults: JobDefaults,
    poll: Duration,
    clock: C,
    shutdown: S,
) where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
    C: Fn() -> DateTime<Tz>,
    S: Future,
{
    info!("Scheduler engine started");
    log_next_run(&scheduler);

    let mut interval = tokio::time::interval(poll);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);

    loop {
        let poll_once = async {
            interval.tick().await;
            let now = clock();
            if run_pending(&mut scheduler, runner, defaults, &now).await > 0 {
                log_next_run(&scheduler);
            }
        };

        tokio::select! {
            _ = poll_once => {}
            _ = &mut shutdown => {
                info!("Scheduler stopping");
                break;
            }
        }
    }
}

fn log_next_run<Tz>(scheduler: &Scheduler<Tz>)
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    if let Some((at, trigger)) = scheduler.next_run() {
        info!(schedule = %trigger.name, state = %trigger.state, at = %at.to_rfc3339(), "Next run");
    }
}
