//! Chromium-backed view using chromiumoxide.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use doccapture_shared::{BrowserConfig, CaptureError, Result};

use crate::BrowserView;

/// A single Chromium tab.
pub struct ChromiumView {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
    /// Whether we launched the browser process (and so must shut it down).
    owns_browser: bool,
}

impl ChromiumView {
    /// Launch a Chromium instance (or attach to `remote_url`) and open a blank tab.
    #[instrument(skip_all, fields(remote = config.remote_url.is_some(), headless = config.headless))]
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let navigation_timeout = Duration::from_secs(config.navigation_timeout_secs);

        let (browser, mut handler, owns_browser) = match &config.remote_url {
            Some(ws_url) => {
                info!(%ws_url, "connecting to running browser");
                let (browser, handler) = Browser::connect(ws_url.as_str())
                    .await
                    .map_err(|e| browser_err("failed to connect to browser", e))?;
                (browser, handler, false)
            }
            None => {
                let mut builder = ChromeConfig::builder()
                    .request_timeout(navigation_timeout)
                    .arg("--disable-gpu")
                    .arg("--disable-dev-shm-usage")
                    .arg("--disable-extensions");
                if !config.headless {
                    builder = builder.with_head();
                }
                if let Some(path) = &config.executable {
                    builder = builder.chrome_executable(PathBuf::from(path));
                }
                let chrome_config = builder.build().map_err(|e| {
                    CaptureError::Browser(format!("invalid browser config: {e}"))
                })?;

                let (browser, handler) = Browser::launch(chrome_config)
                    .await
                    .map_err(|e| browser_err("failed to launch Chromium", e))?;
                (browser, handler, true)
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| browser_err("failed to open tab", e))?;

        info!("browser ready");

        Ok(Self {
            browser,
            page,
            handler,
            navigation_timeout,
            owns_browser,
        })
    }

    async fn elements(&self, selector: &str) -> Result<Vec<Element>> {
        self.page
            .find_elements(selector)
            .await
            .map_err(|e| browser_err(&format!("query '{selector}' failed"), e))
    }
}

#[async_trait]
impl BrowserView for ChromiumView {
    async fn goto(&mut self, url: &Url) -> Result<()> {
        debug!(%url, "navigating");

        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(browser_err(&format!("navigation to {url} failed"), e)),
            Err(_) => {
                return Err(CaptureError::Browser(format!(
                    "navigation to {url} timed out after {}s",
                    self.navigation_timeout.as_secs()
                )));
            }
        }

        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| browser_err("waiting for load failed", e))?;
        Ok(())
    }

    async fn texts(&mut self, selector: &str) -> Result<Vec<String>> {
        let mut texts = Vec::new();
        for element in self.elements(selector).await? {
            let text = element
                .inner_text()
                .await
                .map_err(|e| browser_err("reading innerText failed", e))?;
            texts.push(text.unwrap_or_default());
        }
        Ok(texts)
    }

    async fn click(&mut self, selector: &str, nth: usize) -> Result<()> {
        let elements = self.elements(selector).await?;
        let element = elements.get(nth).ok_or_else(|| {
            CaptureError::Browser(format!(
                "no element #{nth} for '{selector}' ({} matches)",
                elements.len()
            ))
        })?;

        element
            .click()
            .await
            .map_err(|e| browser_err(&format!("click on '{selector}' #{nth} failed"), e))?;
        Ok(())
    }

    async fn inner_html(&mut self, selector: &str) -> Result<Option<String>> {
        let Some(element) = self.elements(selector).await?.into_iter().next() else {
            return Ok(None);
        };

        element
            .inner_html()
            .await
            .map_err(|e| browser_err("reading innerHTML failed", e))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = *self;
        if this.owns_browser {
            if let Err(e) = this.browser.close().await {
                warn!(error = %e, "browser close failed");
            }
            let _ = this.browser.wait().await;
        } else if let Err(e) = this.page.close().await {
            warn!(error = %e, "tab close failed");
        }

        this.handler.abort();
        info!("browser closed");
        Ok(())
    }
}

fn browser_err(context: &str, err: impl std::fmt::Display) -> CaptureError {
    CaptureError::Browser(format!("{context}: {err}"))
}
