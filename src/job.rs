//! Job model: desired Wi-Fi state, per-run flags, and screenshot artifact naming.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target Wi-Fi power state a job drives the modem towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DesiredState {
    On,
    Off,
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredState::On => write!(f, "ON"),
            DesiredState::Off => write!(f, "OFF"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown Wi-Fi state '{0}', expected 'on' or 'off'")]
pub struct ParseStateError(String);

impl FromStr for DesiredState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(DesiredState::On),
            "off" => Ok(DesiredState::Off),
            _ => Err(ParseStateError(s.to_string())),
        }
    }
}

/// One request to put the Wi-Fi into a desired state.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: uuid::Uuid,
    pub state: DesiredState,
    /// Exercise the sequence without pressing Save.
    pub test_mode: bool,
    pub headless: bool,
}

impl Job {
    pub fn new(state: DesiredState) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            state,
            test_mode: false,
            headless: true,
        }
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

/// How an attempt ended, as encoded in the screenshot file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
    Test,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Error => write!(f, "error"),
            Outcome::Test => write!(f, "test"),
        }
    }
}

/// `screenshot_<outcome>_<state>_<unixtime>.png`
pub fn screenshot_name(outcome: Outcome, state: DesiredState, unix_secs: i64) -> String {
    format!("screenshot_{}_{}_{}.png", outcome, state, unix_secs)
}

/// Full path of a screenshot taken now inside `dir`.
pub fn screenshot_path(dir: &Path, outcome: Outcome, state: DesiredState) -> PathBuf {
    dir.join(screenshot_name(outcome, state, Utc::now().timestamp()))
}
