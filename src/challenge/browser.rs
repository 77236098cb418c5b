//! Browser-driven challenge resolver
//!
//! Launches a visible Chromium per [`solve`](ChallengeResolver::solve) call,
//! installs the current cookies, clicks the verification widget and reads
//! the cookie jar back. The browser is never pooled: every call owns a
//! [`BrowserSession`] that is shut down on success and failure alike, and
//! killed on drop if the call is cancelled mid-way.

use super::ChallengeResolver;
use crate::{
    Error, Result,
    config::ChallengeSettings,
    session::{CookieJar, parse_cookie_string},
    types::Credentials,
};
use async_trait::async_trait;
use chromiumoxide::{
    Page,
    browser::{Browser, BrowserConfig},
    cdp::browser_protocol::{network::CookieParam, page::AddScriptToEvaluateOnNewDocumentParams},
    layout::Point,
};
use futures::StreamExt;
use rand::Rng;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Hides the usual automation fingerprints before any page script runs
const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'plugins', {
    get: () => [
        { name: 'Chrome PDF Plugin' },
        { name: 'Chrome PDF Viewer' },
        { name: 'Native Client' }
    ]
});
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en', 'es'] });
Object.defineProperty(navigator, 'platform', { get: () => 'Win32' });
delete window.cdc_adoQpoasnfa76pfcZLmcfl_Array;
delete window.cdc_adoQpoasnfa76pfcZLmcfl_Promise;
delete window.cdc_adoQpoasnfa76pfcZLmcfl_Symbol;
"#;

/// Horizontal offset of the checkbox inside the widget iframe
const CHECKBOX_OFFSET_X: f64 = 30.0;
const WIDGET_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Challenge resolver backed by a locally installed Chrome/Chromium
#[derive(Debug, Clone)]
pub struct BrowserChallengeResolver {
    settings: ChallengeSettings,
}

impl BrowserChallengeResolver {
    pub fn new(settings: ChallengeSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .with_head()
            .no_sandbox()
            .window_size(1920, 1080)
            .arg(format!("--user-agent={}", self.settings.user_agent))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-infobars")
            .arg("--disable-notifications")
            .arg("--lang=en-US");

        if let Some(path) = &self.settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder
            .build()
            .map_err(|e| Error::challenge(format!("browser configuration: {}", e)))
    }

    async fn run(
        &self,
        session: &BrowserSession,
        target_url: &str,
        credentials: &Credentials,
    ) -> Result<CookieJar> {
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| cdp("opening page", e))?;

        page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
            .map_err(|e| cdp("installing evasion script", e))?;

        tracing::info!("Installing cookies on {}", self.settings.origin);
        page.goto(self.settings.origin.as_str())
            .await
            .map_err(|e| cdp("loading origin", e))?;
        let cookies = cookie_params(&credentials.raw_cookie, &self.settings.cookie_domain)?;
        page.set_cookies(cookies)
            .await
            .map_err(|e| cdp("installing cookies", e))?;

        tracing::info!("Navigating to {}", target_url);
        page.goto(target_url)
            .await
            .map_err(|e| cdp("loading challenge page", e))?;

        if self.wait_for_widget(&page, self.settings.widget_timeout).await {
            self.click_widget(&page).await?;
        } else {
            tracing::warn!("No verification widget found, challenge may already be solved");
        }

        let jar: CookieJar = page
            .get_cookies()
            .await
            .map_err(|e| cdp("reading cookies", e))?
            .into_iter()
            .map(|cookie| (cookie.name, cookie.value))
            .collect();

        if jar.is_empty() {
            return Err(Error::challenge("browser returned an empty cookie jar"));
        }
        Ok(jar)
    }

    /// Poll for the widget until it shows up or `timeout` elapses
    async fn wait_for_widget(&self, page: &Page, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if page.find_element(self.settings.widget_selector.as_str()).await.is_ok() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(WIDGET_POLL_INTERVAL).await;
        }
    }

    async fn click_widget(&self, page: &Page) -> Result<()> {
        let widget = page
            .find_element(self.settings.widget_selector.as_str())
            .await
            .map_err(|e| cdp("locating widget", e))?;
        let bounds = widget
            .bounding_box()
            .await
            .map_err(|e| cdp("measuring widget", e))?;

        let (wander, jitter) = {
            let mut rng = rand::rng();
            (
                Point::new(rng.random_range(0.0..100.0), rng.random_range(0.0..100.0)),
                rng.random_range(-3.0..3.0),
            )
        };

        tracing::debug!("Moving pointer before clicking the widget");
        page.move_mouse(wander)
            .await
            .map_err(|e| cdp("moving pointer", e))?;
        tokio::time::sleep(Duration::from_millis(500)).await;

        let checkbox = Point::new(
            bounds.x + CHECKBOX_OFFSET_X + jitter,
            bounds.y + bounds.height / 2.0 + jitter,
        );
        tracing::info!("Clicking verification checkbox");
        page.click(checkbox)
            .await
            .map_err(|e| cdp("clicking checkbox", e))?;

        tokio::time::sleep(self.settings.settle_delay).await;

        let deadline = Instant::now() + self.settings.grace_period;
        while Instant::now() < deadline {
            if page
                .find_element(self.settings.widget_selector.as_str())
                .await
                .is_err()
            {
                tracing::info!("Verification widget dismissed");
                return Ok(());
            }
            tokio::time::sleep(WIDGET_POLL_INTERVAL).await;
        }
        tracing::warn!("Verification widget still present, it may need manual intervention");
        Ok(())
    }
}

#[async_trait]
impl ChallengeResolver for BrowserChallengeResolver {
    async fn solve(&self, target_url: &str, credentials: &Credentials) -> Result<CookieJar> {
        let session = BrowserSession::launch(self.browser_config()?).await?;
        let result = self.run(&session, target_url, credentials).await;
        session.shutdown().await;
        result
    }
}

/// One launched browser plus its CDP event loop
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: BrowserConfig) -> Result<Self> {
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| cdp("launching browser", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!("Browser launched for challenge solving");
        Ok(Self { browser, handler })
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Waiting for browser exit failed: {}", e);
        }
        self.handler.abort();
        tracing::debug!("Browser session closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Browser's own drop kills the child process
        self.handler.abort();
    }
}

fn cookie_params(raw_cookie: &str, domain: &str) -> Result<Vec<CookieParam>> {
    parse_cookie_string(raw_cookie)
        .into_iter()
        .map(|(name, value)| {
            CookieParam::builder()
                .name(name)
                .value(value)
                .domain(domain)
                .path("/")
                .build()
                .map_err(|e| Error::challenge(format!("building cookie: {}", e)))
        })
        .collect()
}

fn cdp(stage: &str, err: chromiumoxide::error::CdpError) -> Error {
    Error::challenge(format!("{}: {}", stage, err))
}
