//! Headless Chromium page source
//!
//! Used for listings whose pagination only works through script-driven
//! "next" buttons. Every browser call is bounded by the navigation timeout.

use crate::crawler::parser::{is_next_control, normalize_whitespace, parse_anchors};
use crate::crawler::source::{PageSnapshot, PageSource};
use crate::crawler::CrawlError;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

/// Page source backed by a headless Chromium instance
///
/// The browser is launched on `open` and torn down on `close`. Dropping the
/// source without closing it aborts the CDP handler task and lets the
/// browser process be killed with it.
pub struct BrowserPageSource {
    user_agent: String,
    timeout: Duration,
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    page: Option<Page>,
}

impl BrowserPageSource {
    pub fn new(user_agent: String, timeout: Duration) -> Self {
        Self {
            user_agent,
            timeout,
            browser: None,
            handler: None,
            page: None,
        }
    }

    async fn bounded<T, E, F>(&self, operation: &'static str, future: F) -> Result<T, CrawlError>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CrawlError::Browser(format!("{}: {}", operation, e))),
            Err(_) => Err(CrawlError::Timeout {
                operation,
                secs: self.timeout.as_secs(),
            }),
        }
    }

    fn page(&self) -> Result<&Page, CrawlError> {
        self.page.as_ref().ok_or(CrawlError::NotOpen)
    }

    async fn launch(&mut self) -> Result<(), CrawlError> {
        let config = BrowserConfig::builder()
            .request_timeout(self.timeout)
            .arg(format!("--user-agent={}", self.user_agent))
            .build()
            .map_err(CrawlError::Browser)?;

        let (browser, mut handler) = self.bounded("launch", Browser::launch(config)).await?;
        self.handler = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        }));
        self.browser = Some(browser);
        Ok(())
    }
}

#[async_trait]
impl PageSource for BrowserPageSource {
    async fn open(&mut self, url: &Url) -> Result<(), CrawlError> {
        if self.browser.is_none() {
            self.launch().await?;
        }
        let browser = self.browser.as_ref().ok_or(CrawlError::NotOpen)?;
        let page = self
            .bounded("open page", browser.new_page(url.as_str()))
            .await?;
        self.bounded("seed navigation", page.wait_for_navigation())
            .await?;
        self.page = Some(page);
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, CrawlError> {
        let page = self.page()?;
        let html = self.bounded("read content", page.content()).await?;
        let current = self.bounded("read url", page.url()).await?;
        let url = current
            .and_then(|u| Url::parse(&u).ok())
            .ok_or_else(|| CrawlError::Browser("page has no URL".to_string()))?;

        Ok(PageSnapshot {
            url,
            anchors: parse_anchors(&html),
        })
    }

    async fn follow_next(&mut self) -> Result<bool, CrawlError> {
        let page = self.page()?;
        let elements = self.bounded("find anchors", page.find_elements("a")).await?;

        for element in elements {
            let text = self
                .bounded("read anchor text", element.inner_text())
                .await?
                .unwrap_or_default();
            if !is_next_control(&normalize_whitespace(std::iter::once(text.as_str()))) {
                continue;
            }

            debug!("Clicking next control '{}'", text.trim());
            self.bounded("click next", element.click()).await?;
            self.bounded("next navigation", page.wait_for_navigation())
                .await?;
            return Ok(true);
        }

        Ok(false)
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Failed to close page: {}", e);
            }
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Failed to reap browser process: {}", e);
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

impl Drop for BrowserPageSource {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}
