//! Job runner: one job, as many attempts as it takes.
//!
//! Each attempt reads the credential file, launches a fresh browser, runs
//! the admin console sequence and closes the browser again, whatever
//! happened. Credential problems end the job at once; automation failures
//! are retried after [`RetryPolicy::delay_for`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};

use crate::browser::{AutomationError, Driver, LaunchOptions};
use crate::config::{Config, RetryConfig};
use crate::credentials::{self, CredentialError};
use crate::job::{DesiredState, Job, Outcome};
use crate::sequence::{self, Completed, Pacing};

/// Why a single attempt failed.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("{source}")]
    Automation {
        #[source]
        source: AutomationError,
        /// Error screenshot, when one could be captured.
        screenshot: Option<PathBuf>,
    },
}

impl AttemptError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Automation { .. })
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job aborted: {0}")]
    Credentials(#[source] CredentialError),

    #[error("job gave up after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: AttemptError,
    },
}

/// Summary of a job that reached its goal.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: uuid::Uuid,
    pub state: DesiredState,
    pub outcome: Outcome,
    pub attempts: u32,
    pub artifact: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            delay: Duration::from_secs(cfg.delay_secs),
            multiplier: cfg.multiplier.max(1),
            max_delay: Duration::from_secs(cfg.max_delay_secs.max(cfg.delay_secs)),
            max_attempts: cfg.max_attempts,
        }
    }

    /// Fixed delay, never gives up.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            multiplier: 1,
            max_delay: delay,
            max_attempts: None,
        }
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let factor = self.multiplier.saturating_pow(exp);
        self.delay.saturating_mul(factor).min(self.max_delay)
    }

    fn gives_up_after(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Everything a runner needs besides the driver.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub credentials_path: PathBuf,
    pub artifacts_dir: PathBuf,
    pub browser: LaunchOptions,
    pub pacing: Pacing,
    pub retry: RetryPolicy,
}

impl RunnerSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            credentials_path: cfg.credentials.path.clone(),
            artifacts_dir: cfg.artifacts.dir.clone(),
            browser: LaunchOptions::from_config(&cfg.browser),
            pacing: Pacing::from_config(&cfg.pacing),
            retry: RetryPolicy::from_config(&cfg.retry),
        }
    }
}

#[derive(Clone)]
pub struct JobRunner {
    driver: Arc<dyn Driver>,
    settings: RunnerSettings,
}

impl JobRunner {
    pub fn new(driver: Arc<dyn Driver>, settings: RunnerSettings) -> Self {
        Self { driver, settings }
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Run `job` until an attempt succeeds.
    ///
    /// With the default policy this only returns `Ok` or
    /// [`JobError::Credentials`].
    pub async fn run(&self, job: &Job) -> Result<JobReport, JobError> {
        let span = info_span!("job", job_id = %job.id, state = %job.state);
        self.run_inner(job).instrument(span).await
    }

    async fn run_inner(&self, job: &Job) -> Result<JobReport, JobError> {
        info!(test_mode = job.test_mode, headless = job.headless, "starting job");
        let started_at = Utc::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let span = info_span!("attempt", n = attempt);
            match self.attempt(job).instrument(span).await {
                Ok(done) => {
                    info!(attempts = attempt, outcome = %done.outcome, "job completed");
                    return Ok(JobReport {
                        job_id: job.id,
                        state: job.state,
                        outcome: done.outcome,
                        attempts: attempt,
                        artifact: done.artifact,
                        started_at,
                        finished_at: Utc::now(),
                    });
                }
                Err(AttemptError::Credentials(e)) => {
                    error!(error = %e, "credential file unusable, aborting job");
                    return Err(JobError::Credentials(e));
                }
                Err(e) => {
                    if self.settings.retry.gives_up_after(attempt) {
                        error!(attempts = attempt, error = %e, "giving up");
                        return Err(JobError::Exhausted {
                            attempts: attempt,
                            source: e,
                        });
                    }
                    let delay = self.settings.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One attempt: fresh credentials, fresh browser, the full sequence.
    ///
    /// The browser is closed exactly once before returning, on every path.
    pub async fn attempt(&self, job: &Job) -> Result<Completed, AttemptError> {
        let credentials = credentials::load(&self.settings.credentials_path)?;

        if let Err(e) = tokio::fs::create_dir_all(&self.settings.artifacts_dir).await {
            warn!(
                dir = %self.settings.artifacts_dir.display(),
                error = %e,
                "could not create artifact directory"
            );
        }

        let opts = self.settings.browser.clone().with_headless(job.headless);
        let mut session = self
            .driver
            .launch(&opts)
            .await
            .map_err(|source| AttemptError::Automation {
                source,
                screenshot: None,
            })?;

        let result = sequence::perform(
            session.as_mut(),
            job,
            &credentials,
            &self.settings.pacing,
            &self.settings.artifacts_dir,
        )
        .await;

        info!("closing browser");
        if let Err(e) = session.close().await {
            warn!(error = %e, "browser did not close cleanly");
        }

        result.map_err(|failed| AttemptError::Automation {
            source: failed.error,
            screenshot: failed.screenshot,
        })
    }
}
