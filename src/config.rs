//! TOML configuration for wifi-curfew.
//!
//! Every section has compiled-in defaults, so an empty file (or no file at
//! all) yields the stock 23:00 OFF / 03:30 ON schedule.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "WIFI_CURFEW_CONFIG";

/// Config file picked up from the working directory when nothing else is set.
pub const LOCAL_CONFIG: &str = "wifi-curfew.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Try to load configuration from, in order:
    /// 1. The path in `WIFI_CURFEW_CONFIG`.
    /// 2. `./wifi-curfew.toml`.
    /// 3. Compiled-in defaults.
    ///
    /// Runs before logging is set up, so files that were skipped are
    /// reported back in [`Discovered::warnings`] instead of logged.
    pub fn load_or_default() -> Discovered {
        let mut warnings = Vec::new();

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(env_path);
            match Self::load(&path) {
                Ok(config) => return Discovered::from_file(config, path, warnings),
                Err(e) => warnings.push(format!(
                    "{} set but {} could not be loaded, trying fallback: {:#}",
                    CONFIG_ENV,
                    path.display(),
                    e
                )),
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(&local) {
                Ok(config) => return Discovered::from_file(config, local, warnings),
                Err(e) => warnings.push(format!(
                    "local config {} could not be loaded, using defaults: {:#}",
                    local.display(),
                    e
                )),
            }
        }

        Discovered {
            config: Self::default(),
            source: None,
            warnings,
        }
    }

    pub fn validate(&self) -> Result<()> {
        parse_hhmm(&self.schedule.off_at).context("schedule.off_at")?;
        parse_hhmm(&self.schedule.on_at).context("schedule.on_at")?;
        if self.schedule.poll_interval_ms == 0 {
            bail!("schedule.poll_interval_ms must be greater than zero");
        }
        if self.browser.action_timeout_secs == 0 || self.browser.navigation_timeout_secs == 0 {
            bail!("browser timeouts must be greater than zero");
        }
        if self.retry.multiplier == 0 {
            bail!("retry.multiplier must be at least 1");
        }
        if self.retry.max_attempts == Some(0) {
            bail!("retry.max_attempts must be at least 1 when set");
        }
        Ok(())
    }
}

/// Parse a wall-clock `HH:MM` trigger time.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .with_context(|| format!("expected HH:MM, got '{}'", s))
}

/// Result of [`Config::load_or_default`].
#[derive(Debug)]
pub struct Discovered {
    pub config: Config,
    /// File the config came from; `None` means compiled-in defaults.
    pub source: Option<PathBuf>,
    /// Config files that were found but skipped, and why.
    pub warnings: Vec<String>,
}

impl Discovered {
    fn from_file(config: Config, path: PathBuf, warnings: Vec<String>) -> Self {
        Self {
            config,
            source: Some(path),
            warnings,
        }
    }

    /// Emit the deferred messages. Call once the subscriber is installed.
    pub fn log(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
        match &self.source {
            Some(path) => info!(path = %path.display(), "loaded configuration"),
            None => debug!("no config file loaded, using compiled-in defaults"),
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Daily trigger times (local time).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// When the OFF job fires.
    pub off_at: String,
    /// When the ON job fires.
    pub on_at: String,
    /// How often the scheduler checks for due triggers.
    pub poll_interval_ms: u64,
    /// Run scheduled jobs without pressing Save.
    pub test_mode: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            off_at: "23:00".to_string(),
            on_at: "03:30".to_string(),
            poll_interval_ms: 1000,
            test_mode: false,
        }
    }
}

impl ScheduleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Two-line file: password, then admin URL.
    pub path: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("credentials.txt"),
        }
    }
}

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    /// Chromium/Chrome binary; auto-detected when unset.
    pub executable: Option<PathBuf>,
    /// Upper bound for finding and interacting with one element.
    pub action_timeout_secs: u64,
    /// Upper bound for a page navigation.
    pub navigation_timeout_secs: u64,
    pub window_width: u32,
    pub window_height: u32,
    /// Needed when running as root inside containers.
    pub no_sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            action_timeout_secs: 60,
            navigation_timeout_secs: 90,
            window_width: 1280,
            window_height: 800,
            no_sandbox: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Pacing
// ---------------------------------------------------------------------------

/// Fixed pauses inside the admin console sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Time the console needs to establish the session after login.
    pub settle_after_login_ms: u64,
    /// Gap between consecutive toggle clicks.
    pub toggle_gap_ms: u64,
    /// Time for the modem to commit after Save.
    pub commit_wait_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            settle_after_login_ms: 7500,
            toggle_gap_ms: 1000,
            commit_wait_ms: 2000,
        }
    }
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Delay between failed attempts is `delay_secs * multiplier^(n-1)`, capped
/// at `max_delay_secs`. Defaults give a fixed 60 s delay, retried forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub delay_secs: u64,
    pub multiplier: u32,
    pub max_delay_secs: u64,
    /// Give up after this many attempts. Unset means never give up.
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay_secs: 60,
            multiplier: 1,
            max_delay_secs: 60,
            max_attempts: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Where screenshots are written.
    pub dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
