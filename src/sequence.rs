//! The admin console script: log in, open the advanced Wi-Fi settings, flip
//! the three radio toggles and save.
//!
//! Elements are addressed by accessible role and label text, so this module
//! is a contract with the modem's web UI rather than with any state of ours.
//! The console exposes no readiness signal after login, hence the fixed
//! pauses from [`Pacing`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::browser::{AutomationError, Role, Session, Target};
use crate::config::PacingConfig;
use crate::credentials::Credentials;
use crate::job::{screenshot_path, Job, Outcome};

pub const MANAGE_WIFI: Target = Target::role(Role::Link, "Manage my Wi-Fi Primary");
pub const PASSWORD: Target = Target::role(Role::Textbox, "Password:");
pub const LOG_IN: Target = Target::role(Role::Button, "Log in");
pub const ADVANCED_SETTINGS: Target = Target::role(Role::Button, "Advanced settings");
pub const SAVE: Target = Target::role(Role::Button, "Save");

/// The three radio toggles, clicked in this order.
pub const TOGGLES: [Target; 3] = [
    Target::text("ON", 0),
    Target::text("ON", 1),
    Target::text("ON", 2),
];

#[derive(Debug, Clone)]
pub struct Pacing {
    pub settle_after_login: Duration,
    pub toggle_gap: Duration,
    pub commit_wait: Duration,
}

impl Pacing {
    pub fn from_config(cfg: &PacingConfig) -> Self {
        Self {
            settle_after_login: Duration::from_millis(cfg.settle_after_login_ms),
            toggle_gap: Duration::from_millis(cfg.toggle_gap_ms),
            commit_wait: Duration::from_millis(cfg.commit_wait_ms),
        }
    }

    /// No pauses at all.
    pub fn immediate() -> Self {
        Self {
            settle_after_login: Duration::ZERO,
            toggle_gap: Duration::ZERO,
            commit_wait: Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_config(&PacingConfig::default())
    }
}

/// What a completed sequence left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    pub outcome: Outcome,
    pub artifact: Option<PathBuf>,
}

/// A failed sequence, with the error screenshot if one could be taken.
#[derive(Debug)]
pub struct Failed {
    pub error: AutomationError,
    pub screenshot: Option<PathBuf>,
}

/// Run the whole script once against an open session.
///
/// Any step failing stops the script, captures
/// `screenshot_error_<state>_<ts>.png` on a best-effort basis and returns
/// [`Failed`]. The session is left open; closing it is the caller's job.
pub async fn perform(
    session: &mut dyn Session,
    job: &Job,
    credentials: &Credentials,
    pacing: &Pacing,
    artifacts: &Path,
) -> Result<Completed, Failed> {
    match steps(session, job, credentials, pacing, artifacts).await {
        Ok(done) => Ok(done),
        Err(err) => {
            error!(error = %err, "automation step failed");
            let path = screenshot_path(artifacts, Outcome::Error, job.state);
            let screenshot = match session.screenshot(&path).await {
                Ok(()) => {
                    warn!(path = %path.display(), "error screenshot saved");
                    Some(path)
                }
                Err(e) => {
                    warn!(error = %e, "could not capture error screenshot");
                    None
                }
            };
            Err(Failed {
                error: err,
                screenshot,
            })
        }
    }
}

async fn steps(
    session: &mut dyn Session,
    job: &Job,
    credentials: &Credentials,
    pacing: &Pacing,
    artifacts: &Path,
) -> Result<Completed, AutomationError> {
    info!(url = %credentials.admin_url(), "navigating to modem admin page");
    session.goto(credentials.admin_url()).await?;

    info!("opening Wi-Fi management");
    session.click(&MANAGE_WIFI).await?;

    info!("entering password");
    session.fill(&PASSWORD, credentials.password()).await?;

    info!("logging in");
    session.click(&LOG_IN).await?;

    info!("opening advanced settings");
    session.click(&ADVANCED_SETTINGS).await?;
    sleep(pacing.settle_after_login).await;

    info!(state = %job.state, "switching radio toggles");
    for (i, toggle) in TOGGLES.iter().enumerate() {
        if i > 0 {
            sleep(pacing.toggle_gap).await;
        }
        session.click(toggle).await?;
    }

    if job.test_mode {
        if job.headless {
            let path = screenshot_path(artifacts, Outcome::Test, job.state);
            session.screenshot(&path).await?;
            info!(path = %path.display(), "test mode: skipped Save, screenshot saved");
            return Ok(Completed {
                outcome: Outcome::Test,
                artifact: Some(path),
            });
        }
        info!("test mode: skipped Save");
        session.pause().await?;
        return Ok(Completed {
            outcome: Outcome::Test,
            artifact: None,
        });
    }

    info!("saving");
    session.click(&SAVE).await?;
    sleep(pacing.commit_wait).await;

    let path = screenshot_path(artifacts, Outcome::Success, job.state);
    session.screenshot(&path).await?;
    info!(state = %job.state, path = %path.display(), "Wi-Fi state saved");
    Ok(Completed {
        outcome: Outcome::Success,
        artifact: Some(path),
    })
}
