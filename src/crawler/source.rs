//! Listing page sources
//!
//! A page source loads listing pages and activates their "next" control.
//! The coordinator only talks to the [`PageSource`] trait, so the same crawl
//! session runs over plain HTTP or a headless browser.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{find_next_anchor, parse_anchors, Anchor};
use crate::crawler::CrawlError;
use crate::url::resolve_href;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

/// The anchors of the currently loaded listing page
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: Url,
    pub anchors: Vec<Anchor>,
}

impl PageSnapshot {
    /// Identifies the page by its URL and the hrefs it links to
    ///
    /// Script-driven listings can change their content without changing
    /// the address, so the URL alone does not identify a page.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.url.as_str().as_bytes());
        for anchor in &self.anchors {
            hasher.update(b"\n");
            hasher.update(anchor.href.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Loads listing pages and follows their pagination
#[async_trait]
pub trait PageSource: Send {
    /// Loads the seed page
    async fn open(&mut self, url: &Url) -> Result<(), CrawlError>;

    /// Returns the anchors of the current page
    async fn snapshot(&mut self) -> Result<PageSnapshot, CrawlError>;

    /// Activates the first "next" control on the current page
    ///
    /// Returns `Ok(false)` when the page has no such control.
    async fn follow_next(&mut self) -> Result<bool, CrawlError>;

    /// Releases any resources held by the source
    async fn close(&mut self);
}

/// Page source that fetches listing pages over HTTP
///
/// Pagination follows the href of the "next" anchor, which covers listings
/// whose pages are plain links.
pub struct HttpPageSource {
    fetcher: Fetcher,
    current: Option<PageSnapshot>,
}

impl HttpPageSource {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            current: None,
        }
    }

    async fn load(&mut self, url: &Url) -> Result<(), CrawlError> {
        let document = self.fetcher.fetch(url.as_str()).await?;
        let final_url = Url::parse(&document.final_url).unwrap_or_else(|_| url.clone());
        let anchors = parse_anchors(&document.text());
        debug!("Loaded {} with {} anchors", final_url, anchors.len());
        self.current = Some(PageSnapshot {
            url: final_url,
            anchors,
        });
        Ok(())
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn open(&mut self, url: &Url) -> Result<(), CrawlError> {
        self.load(url).await
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, CrawlError> {
        self.current.clone().ok_or(CrawlError::NotOpen)
    }

    async fn follow_next(&mut self) -> Result<bool, CrawlError> {
        let next = {
            let page = self.current.as_ref().ok_or(CrawlError::NotOpen)?;
            match find_next_anchor(&page.anchors) {
                Some(anchor) => resolve_href(&anchor.href, &page.url),
                None => return Ok(false),
            }
        };

        match next {
            Some(url) => {
                self.load(&url).await?;
                Ok(true)
            }
            None => Err(CrawlError::Navigation(
                "next control has no followable href".to_string(),
            )),
        }
    }

    async fn close(&mut self) {
        self.current = None;
    }
}
