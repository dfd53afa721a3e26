//! Chromium driver over the DevTools protocol (chromiumoxide).

use std::path::Path;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use super::locator::{lookup_script, marked_selector};
use super::{AutomationError, Driver, LaunchOptions, Session, Target};

/// How often a pending element lookup is retried.
const LOOKUP_POLL: Duration = Duration::from_millis(250);

const CLEAR_VALUE_JS: &str = "function() { \
    this.value = ''; \
    this.dispatchEvent(new Event('input', { bubbles: true })); \
}";

/// Launches a fresh Chromium per attempt with a throwaway profile.
#[derive(Debug, Default, Clone)]
pub struct ChromeDriver;

#[async_trait::async_trait]
impl Driver for ChromeDriver {
    async fn launch(&self, opts: &LaunchOptions) -> Result<Box<dyn Session>, AutomationError> {
        let profile = tempfile::Builder::new()
            .prefix("wifi-curfew-profile-")
            .tempdir()
            .map_err(|e| AutomationError::Launch(format!("scratch profile: {}", e)))?;

        let (width, height) = opts.window;
        let mut builder = CdpConfig::builder()
            .user_data_dir(profile.path())
            .incognito()
            .window_size(width, height)
            .request_timeout(opts.navigation_timeout);
        if !opts.headless {
            builder = builder.with_head();
        }
        if let Some(exe) = &opts.executable {
            builder = builder.chrome_executable(exe);
        }
        if opts.no_sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(AutomationError::Launch)?;

        info!(headless = opts.headless, "launching browser");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AutomationError::Launch(e.to_string()))?;

        // The handler must be polled for the connection to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "cdp handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let mut session = ChromeSession::new(browser, None, handler_task, profile, opts);
                let _ = session.close().await;
                return Err(AutomationError::Launch(format!("open page: {}", e)));
            }
        };

        Ok(Box::new(ChromeSession::new(
            browser,
            Some(page),
            handler_task,
            profile,
            opts,
        )))
    }
}

struct ChromeSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    action_timeout: Duration,
    navigation_timeout: Duration,
    lookups: u64,
    // Removed when the session is dropped, after the browser is gone.
    _profile: TempDir,
}

impl ChromeSession {
    fn new(
        browser: Browser,
        page: Option<Page>,
        handler_task: JoinHandle<()>,
        profile: TempDir,
        opts: &LaunchOptions,
    ) -> Self {
        Self {
            browser: Some(browser),
            page,
            handler_task,
            action_timeout: opts.action_timeout,
            navigation_timeout: opts.navigation_timeout,
            lookups: 0,
            _profile: profile,
        }
    }

    fn page(&self) -> Result<&Page, AutomationError> {
        self.page
            .as_ref()
            .ok_or_else(|| AutomationError::Close("session already closed".to_string()))
    }

    /// Poll the page until `target` is present and visible.
    async fn locate(&mut self, target: &Target) -> Result<Element, AutomationError> {
        self.lookups += 1;
        let token = format!("el-{}", self.lookups);
        let script = lookup_script(target, &token);
        let deadline = Instant::now() + self.action_timeout;
        let page = self.page()?;

        loop {
            match page.evaluate(script.as_str()).await {
                Ok(result) => {
                    if result.into_value::<bool>().unwrap_or(false) {
                        return page.find_element(marked_selector(&token)).await.map_err(|e| {
                            AutomationError::Interaction {
                                action: "resolve",
                                target: target.to_string(),
                                reason: e.to_string(),
                            }
                        });
                    }
                }
                // The execution context is torn down while a page navigates.
                Err(e) => debug!(target = %target, error = %e, "lookup script failed, retrying"),
            }

            if Instant::now() >= deadline {
                return Err(AutomationError::ElementNotFound {
                    target: target.to_string(),
                    waited: self.action_timeout,
                });
            }
            sleep(LOOKUP_POLL).await;
        }
    }
}

#[async_trait::async_trait]
impl Session for ChromeSession {
    async fn goto(&mut self, url: &str) -> Result<(), AutomationError> {
        let page = self.page()?;
        match timeout(self.navigation_timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AutomationError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(AutomationError::NavigationTimeout {
                url: url.to_string(),
                timeout: self.navigation_timeout,
            }),
        }
    }

    async fn click(&mut self, target: &Target) -> Result<(), AutomationError> {
        let element = self.locate(target).await?;
        let interaction = |reason: String| AutomationError::Interaction {
            action: "click",
            target: target.to_string(),
            reason,
        };
        match timeout(self.action_timeout, element.click()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(interaction(e.to_string())),
            Err(_) => Err(interaction("timed out".to_string())),
        }
    }

    async fn fill(&mut self, target: &Target, value: &str) -> Result<(), AutomationError> {
        let element = self.locate(target).await?;
        let interaction = |reason: String| AutomationError::Interaction {
            action: "fill",
            target: target.to_string(),
            reason,
        };
        let typed = async {
            element.click().await?;
            element.call_js_fn(CLEAR_VALUE_JS, false).await?;
            element.type_str(value).await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };
        match timeout(self.action_timeout, typed).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(interaction(e.to_string())),
            Err(_) => Err(interaction("timed out".to_string())),
        }
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), AutomationError> {
        let page = self.page()?;
        page.save_screenshot(ScreenshotParams::builder().build(), path)
            .await
            .map(|_| ())
            .map_err(|e| AutomationError::Screenshot {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn pause(&mut self) -> Result<(), AutomationError> {
        info!("paused for manual inspection; press Enter to resume");
        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| AutomationError::Pause(e.to_string()))?;
        if read == 0 {
            warn!("stdin closed, resuming without operator input");
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AutomationError> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };
        self.page = None;

        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "waiting for browser exit failed");
        }
        self.handler_task.abort();
        closed
            .map(|_| ())
            .map_err(|e| AutomationError::Close(e.to_string()))
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // Dropping an unclosed Browser kills the child process.
        if self.browser.is_some() {
            warn!("browser session dropped without close");
        }
        self.handler_task.abort();
    }
}
