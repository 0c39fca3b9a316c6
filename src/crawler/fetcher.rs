//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests, including:
//! - Building HTTP clients with an identifying user agent string
//! - GET requests with a mandatory whole-request timeout
//! - Content-Type classification for PDF documents
//! - Error classification

use crate::config::UserAgentConfig;
use crate::url::LinkKind;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors returned when a resource could not be retrieved
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    #[error("Network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// The server answered, but not with a PDF
    #[error("Expected a PDF at {url}, got Content-Type '{content_type}'")]
    NotAPdf { url: String, content_type: String },
}

impl FetchError {
    fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

/// A successfully retrieved resource
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Final URL after redirects
    pub final_url: String,
    /// Content-Type header value, empty when absent
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FetchedDocument {
    /// Returns true if the declared Content-Type is a PDF
    pub fn is_pdf(&self) -> bool {
        self.content_type
            .to_ascii_lowercase()
            .contains("application/pdf")
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Formats the identifying User-Agent header value
///
/// Format: `CrawlerName/Version (+ContactURL)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{})",
        config.crawler_name, config.crawler_version, config.contact_url
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout applied to every request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use policy_harvester::config::UserAgentConfig;
/// use policy_harvester::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "PolicyHarvester".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retrieves resources for the crawler and the batch extractor
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher from the user agent section and a timeout
    pub fn from_config(
        config: &UserAgentConfig,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config, timeout)?))
    }

    /// Fetches a URL; anything but HTTP 200 is an error
    pub async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        debug!(
            "Fetched {} ({} bytes, content-type '{}')",
            final_url,
            bytes.len(),
            content_type
        );

        Ok(FetchedDocument {
            final_url,
            content_type,
            bytes: bytes.to_vec(),
        })
    }

    /// Fetches a URL that must be served as `application/pdf`
    pub async fn fetch_pdf(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let document = self.fetch(url).await?;
        if !document.is_pdf() {
            return Err(FetchError::NotAPdf {
                url: url.to_string(),
                content_type: document.content_type,
            });
        }
        Ok(document)
    }

    /// Fetches a discovered link according to its kind
    pub async fn fetch_kind(
        &self,
        url: &str,
        kind: LinkKind,
    ) -> Result<FetchedDocument, FetchError> {
        match kind {
            LinkKind::Pdf => self.fetch_pdf(url).await,
            LinkKind::Html => self.fetch(url).await,
        }
    }
}
