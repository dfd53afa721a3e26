//! Browser session boundary.
//!
//! [`Driver`] launches one isolated browser per attempt and hands back a
//! [`Session`] that the interaction sequence drives. The production
//! implementation lives in [`chrome`].

pub mod chrome;
pub mod locator;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::config::BrowserConfig;

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} timed out after {}s", timeout.as_secs())]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{target} not found within {}s", waited.as_secs())]
    ElementNotFound { target: String, waited: Duration },

    #[error("{action} on {target} failed: {reason}")]
    Interaction {
        action: &'static str,
        target: String,
        reason: String,
    },

    #[error("screenshot to {} failed: {reason}", path.display())]
    Screenshot { path: PathBuf, reason: String },

    #[error("manual inspection pause failed: {0}")]
    Pause(String),

    #[error("failed to close browser: {0}")]
    Close(String),
}

/// Accessible roles the admin console sequence looks elements up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Link,
    Textbox,
    Button,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Link => "link",
            Role::Textbox => "textbox",
            Role::Button => "button",
        }
    }
}

/// How to find one element on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// First visible element with `role` whose accessible name contains
    /// `name` (case-insensitive).
    Role { role: Role, name: &'static str },
    /// The `nth` element (counting hidden ones) whose own text is exactly
    /// `text`, once it is visible.
    Text { text: &'static str, nth: usize },
}

impl Target {
    pub const fn role(role: Role, name: &'static str) -> Self {
        Target::Role { role, name }
    }

    pub const fn text(text: &'static str, nth: usize) -> Self {
        Target::Text { text, nth }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Role { role, name } => write!(f, "{} '{}'", role.as_str(), name),
            Target::Text { text, nth } => write!(f, "text '{}' #{}", text, nth),
        }
    }
}

/// Everything needed to start one browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub action_timeout: Duration,
    pub navigation_timeout: Duration,
    pub window: (u32, u32),
    pub no_sandbox: bool,
}

impl LaunchOptions {
    pub fn from_config(cfg: &BrowserConfig) -> Self {
        Self {
            headless: cfg.headless,
            executable: cfg.executable.clone(),
            action_timeout: Duration::from_secs(cfg.action_timeout_secs),
            navigation_timeout: Duration::from_secs(cfg.navigation_timeout_secs),
            window: (cfg.window_width, cfg.window_height),
            no_sandbox: cfg.no_sandbox,
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default())
    }
}

/// Starts browser sessions.
#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    async fn launch(&self, opts: &LaunchOptions) -> Result<Box<dyn Session>, AutomationError>;
}

/// One live page in a single-use browser.
///
/// `close` must be safe to call more than once; only the first call does
/// any work.
#[async_trait::async_trait]
pub trait Session: Send {
    async fn goto(&mut self, url: &str) -> Result<(), AutomationError>;

    async fn click(&mut self, target: &Target) -> Result<(), AutomationError>;

    /// Replace the value of a text input.
    async fn fill(&mut self, target: &Target, value: &str) -> Result<(), AutomationError>;

    async fn screenshot(&mut self, path: &Path) -> Result<(), AutomationError>;

    /// Block until an operator resumes. Only meaningful with a visible window.
    async fn pause(&mut self) -> Result<(), AutomationError>;

    async fn close(&mut self) -> Result<(), AutomationError>;
}
