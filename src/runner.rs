//! Browser ownership, authentication, and the per-scenario retry loop.

use crate::config::{AuthMode, SuiteConfig};
use crate::flow::Flow;
use crate::report::{ScenarioResult, SuiteReport};
use crate::{Error, Result};
use eoka::{Browser, Page};
use fareflow_pages::{LoginPage, PageContext, RetryPolicy, SessionCookies};
use fareflow_scenario::Scenario;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Executes scenarios against one browser session.
pub struct Runner {
    browser: Browser,
    page: Page,
    config: SuiteConfig,
    ctx: PageContext,
}

impl Runner {
    /// Launch the browser per the suite's settings.
    pub async fn new(config: SuiteConfig) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.browser.headless,
            proxy: config.browser.proxy.clone(),
            user_agent: config.browser.user_agent.clone(),
            viewport_width: config.browser.viewport.map(|v| v.width).unwrap_or(1280),
            viewport_height: config.browser.viewport.map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!(
            "launching browser (headless: {}, proxy: {:?})",
            config.browser.headless, config.browser.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        let ctx = PageContext {
            element_timeout_ms: config.timeouts.element_ms,
            retry: RetryPolicy::default(),
            recovery: true,
        };

        Ok(Self { browser, page, config, ctx })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Get past the SSO gate, once per session.
    pub async fn authenticate(&self) -> Result<()> {
        match self.config.auth.mode {
            AuthMode::None => Ok(()),
            AuthMode::Cookies => self.authenticate_with_cookies().await,
            AuthMode::Sso => self.authenticate_interactively().await,
        }
    }

    async fn authenticate_with_cookies(&self) -> Result<()> {
        // validate() guarantees the path is present in cookies mode.
        let Some(ref jar_path) = self.config.auth.cookies_file else {
            return Err(Error::Config("auth.cookies_file missing".into()));
        };
        self.page.goto(&self.config.base_url).await?;
        let jar = SessionCookies::load(jar_path)?;
        jar.inject(&self.page).await?;

        if LoginPage::is_authenticated(&self.page).await? {
            info!("session cookies accepted");
            return Ok(());
        }
        warn!("session cookies stale; falling back to interactive login");
        self.authenticate_interactively().await?;
        // Refresh the jar so the next run skips the form again.
        if let Ok(domain) = domain_of(&self.config.base_url) {
            if let Ok(fresh) = SessionCookies::capture(&self.page, &domain).await {
                if let Err(e) = fresh.save(jar_path) {
                    warn!("could not refresh cookie jar: {e}");
                }
            }
        }
        Ok(())
    }

    async fn authenticate_interactively(&self) -> Result<()> {
        let (Some(username), Some(password)) =
            (&self.config.auth.username, &self.config.auth.password)
        else {
            return Err(Error::Config("interactive login needs auth credentials".into()));
        };
        self.page.goto(&self.config.base_url).await?;
        let login = LoginPage::new(&self.page, &self.ctx);
        login
            .sign_in(&fareflow_pages::Credentials {
                username: username.clone(),
                password: password.clone(),
            })
            .await?;
        info!("signed in");
        Ok(())
    }

    /// Run one scenario with the configured retry. Every attempt starts
    /// over from the search form.
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let started = Instant::now();
        let attempts = self.config.retry.attempts;
        let mut retries = 0;
        let mut last_error = None;
        let mut reached = None;
        let mut pnr = None;
        let mut screenshot = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                retries += 1;
                info!("scenario {}: retry {}/{}", scenario.id, attempt, attempts);
                tokio::time::sleep(std::time::Duration::from_millis(self.config.retry.delay_ms))
                    .await;
            }

            let mut flow = Flow::new(&self.page, &self.ctx, &self.config, scenario);
            match flow.run().await {
                Ok(()) => {
                    return ScenarioResult {
                        id: scenario.id.clone(),
                        description: scenario.description.clone(),
                        passed: true,
                        target: scenario.stage,
                        reached: flow.reached,
                        pnr: flow.pnr,
                        duration_ms: started.elapsed().as_millis() as u64,
                        retries,
                        error: None,
                        screenshot: None,
                    };
                }
                Err(e) => {
                    warn!("scenario {} attempt {attempt} failed: {e}", scenario.id);
                    reached = flow.reached;
                    pnr = flow.pnr;
                    last_error = Some(e.to_string());
                    if attempt == attempts {
                        screenshot = self.capture_failure(&scenario.id).await;
                    }
                }
            }
        }

        ScenarioResult {
            id: scenario.id.clone(),
            description: scenario.description.clone(),
            passed: false,
            target: scenario.stage,
            reached,
            pnr,
            duration_ms: started.elapsed().as_millis() as u64,
            retries,
            error: last_error,
            screenshot,
        }
    }

    /// Run every scenario, collecting the suite report.
    pub async fn run_suite(&self, scenarios: &[Scenario]) -> SuiteReport {
        let mut report = SuiteReport::new(self.config.name.clone());
        for scenario in scenarios {
            info!("running scenario {} ({})", scenario.id, scenario.stage);
            report.record(self.run_scenario(scenario).await);
        }
        report
    }

    async fn capture_failure(&self, scenario_id: &str) -> Option<PathBuf> {
        if !self.config.screenshots.on_failure {
            return None;
        }
        let dir = &self.config.screenshots.dir;
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("cannot create screenshot dir {}: {e}", dir.display());
            return None;
        }
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = dir.join(format!("{scenario_id}-{stamp}.png"));
        match self.page.screenshot().await {
            Ok(data) => match std::fs::write(&path, data) {
                Ok(()) => {
                    info!("failure screenshot: {}", path.display());
                    Some(path)
                }
                Err(e) => {
                    warn!("could not write screenshot: {e}");
                    None
                }
            },
            Err(e) => {
                warn!("could not capture screenshot: {e}");
                None
            }
        }
    }

    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

/// Host part of the base URL, for cookie scoping.
fn domain_of(base_url: &str) -> Result<String> {
    let stripped = base_url
        .strip_prefix("https://")
        .or_else(|| base_url.strip_prefix("http://"))
        .ok_or_else(|| Error::Config(format!("'{base_url}' is not an http(s) URL")))?;
    let host = stripped.split(['/', ':']).next().unwrap_or(stripped);
    if host.is_empty() {
        return Err(Error::Config(format!("'{base_url}' has no host")));
    }
    Ok(host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_extraction() {
        assert_eq!(
            domain_of("https://booking.example-air.com/booking/search").unwrap(),
            "booking.example-air.com"
        );
        assert_eq!(domain_of("http://localhost:8080").unwrap(), "localhost");
        assert!(domain_of("booking.example-air.com").is_err());
    }
}
