//! Crawler module for document link discovery
//!
//! This module contains the discovery side of the pipeline, including:
//! - HTTP fetching with a finite timeout and an identifying user agent
//! - Listing page parsing and "next" control detection
//! - Page sources for plain HTTP and headless browser pagination
//! - Crawl job coordination (sessions, pause/resume, completion)

#[cfg(feature = "browser")]
mod browser;
mod coordinator;
mod fetcher;
mod parser;
mod source;

#[cfg(feature = "browser")]
pub use browser::BrowserPageSource;
pub use coordinator::{Coordinator, JobRunReport, JobSummary, SessionOutcome, SessionReport};
pub use fetcher::{build_http_client, user_agent_string, FetchError, FetchedDocument, Fetcher};
pub use parser::{find_next_anchor, is_next_control, parse_anchors, Anchor};
pub(crate) use parser::normalize_whitespace;
pub use source::{HttpPageSource, PageSnapshot, PageSource};

use thiserror::Error;

/// Errors raised while driving a listing page source
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Failed to load seed page {url}: {reason}")]
    SeedUnavailable { url: String, reason: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("No page is open")]
    NotOpen,
}
