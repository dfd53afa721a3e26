//! Scripted in-memory browser driver shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wifi_curfew::browser::{AutomationError, Driver, LaunchOptions, Session, Target};
use wifi_curfew::runner::{JobRunner, RetryPolicy, RunnerSettings};
use wifi_curfew::sequence::Pacing;

/// What one attempt's page should do.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Fail the first interaction with this target.
    pub fail_on: Option<String>,
    pub fail_launch: bool,
    pub fail_close: bool,
}

impl Script {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn fail_on(target: &str) -> Self {
        Self {
            fail_on: Some(target.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct Log {
    pub launches: usize,
    pub closes: usize,
    pub headless: Vec<bool>,
    pub actions: Vec<String>,
    pub screenshots: Vec<PathBuf>,
}

/// Plays one [`Script`] per launch; once exhausted every attempt succeeds.
#[derive(Clone, Default)]
pub struct FakeDriver {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    pub log: Arc<Mutex<Log>>,
}

impl FakeDriver {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            log: Arc::default(),
        }
    }

    pub fn launches(&self) -> usize {
        self.log.lock().unwrap().launches
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }

    pub fn actions(&self) -> Vec<String> {
        self.log.lock().unwrap().actions.clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.log.lock().unwrap().screenshots.clone()
    }
}

#[async_trait::async_trait]
impl Driver for FakeDriver {
    async fn launch(&self, opts: &LaunchOptions) -> Result<Box<dyn Session>, AutomationError> {
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        {
            let mut log = self.log.lock().unwrap();
            log.headless.push(opts.headless);
            if script.fail_launch {
                return Err(AutomationError::Launch("chromium not found".to_string()));
            }
            log.launches += 1;
        }
        Ok(Box::new(FakeSession {
            script,
            log: Arc::clone(&self.log),
            closed: false,
        }))
    }
}

struct FakeSession {
    script: Script,
    log: Arc<Mutex<Log>>,
    closed: bool,
}

impl FakeSession {
    fn act(&mut self, action: String, target: &Target) -> Result<(), AutomationError> {
        if self.script.fail_on.as_deref() == Some(target.to_string().as_str()) {
            return Err(AutomationError::ElementNotFound {
                target: target.to_string(),
                waited: Duration::from_secs(60),
            });
        }
        self.log.lock().unwrap().actions.push(action);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Session for FakeSession {
    async fn goto(&mut self, url: &str) -> Result<(), AutomationError> {
        self.log.lock().unwrap().actions.push(format!("goto {}", url));
        Ok(())
    }

    async fn click(&mut self, target: &Target) -> Result<(), AutomationError> {
        self.act(format!("click {}", target), target)
    }

    async fn fill(&mut self, target: &Target, _value: &str) -> Result<(), AutomationError> {
        self.act(format!("fill {}", target), target)
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), AutomationError> {
        std::fs::write(path, b"\x89PNG").map_err(|e| AutomationError::Screenshot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.log.lock().unwrap().screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), AutomationError> {
        self.log.lock().unwrap().actions.push("pause".to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AutomationError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.log.lock().unwrap().closes += 1;
        if self.script.fail_close {
            return Err(AutomationError::Close("browser crashed".to_string()));
        }
        Ok(())
    }
}

/// A temp workspace holding a credential file and an artifact directory.
pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn with_credentials(contents: &str) -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("credentials.txt"), contents).unwrap();
        Self { dir }
    }

    pub fn without_credentials() -> Self {
        Self {
            dir: tempfile::TempDir::new().unwrap(),
        }
    }

    pub fn artifacts(&self) -> PathBuf {
        self.dir.path().join("shots")
    }

    pub fn settings(&self, retry: RetryPolicy) -> RunnerSettings {
        RunnerSettings {
            credentials_path: self.dir.path().join("credentials.txt"),
            artifacts_dir: self.artifacts(),
            browser: LaunchOptions::default(),
            pacing: Pacing::immediate(),
            retry,
        }
    }

    pub fn runner(&self, driver: &FakeDriver, retry: RetryPolicy) -> JobRunner {
        JobRunner::new(Arc::new(driver.clone()), self.settings(retry))
    }

    /// File names in the artifact directory, sorted.
    pub fn artifact_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(self.artifacts()) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }
}

pub const GOOD_CREDENTIALS: &str = "hunter2\nhttp://192.168.0.1/\n";
