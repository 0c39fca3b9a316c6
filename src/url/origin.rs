use crate::{UrlError, UrlResult};
use url::Url;

/// The host a crawl job is confined to
///
/// Derived from the job's seed URL. Links are kept only when they share the
/// seed's host and explicit port and use an HTTP(S) scheme. The scheme itself
/// may differ, so an `http://` link on an `https://` seed's host is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOrigin {
    host: String,
    port: Option<u16>,
}

impl SeedOrigin {
    /// Builds the origin from an already parsed seed URL
    pub fn from_url(url: &Url) -> UrlResult<Self> {
        if !is_http_scheme(url) {
            return Err(UrlError::InvalidScheme(url.scheme().to_string()));
        }
        let host = url.host_str().ok_or(UrlError::MissingHost)?;
        Ok(Self {
            host: host.to_lowercase(),
            port: url.port(),
        })
    }

    /// Returns true if `url` is an HTTP(S) URL on the seed's host and port
    pub fn contains(&self, url: &Url) -> bool {
        if !is_http_scheme(url) {
            return false;
        }
        match url.host_str() {
            Some(host) => {
                host.eq_ignore_ascii_case(&self.host) && url.port() == self.port
            }
            None => false,
        }
    }
}

/// Parses and validates a seed URL submitted for a new crawl job
///
/// # Examples
///
/// ```
/// use policy_harvester::url::parse_seed_url;
///
/// assert!(parse_seed_url("https://example.org/docs").is_ok());
/// assert!(parse_seed_url("ftp://example.org/docs").is_err());
/// ```
pub fn parse_seed_url(seed: &str) -> UrlResult<Url> {
    let url = Url::parse(seed.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    SeedOrigin::from_url(&url)?;
    Ok(url)
}

fn is_http_scheme(url: &Url) -> bool {
    url.scheme() == "http" || url.scheme() == "https"
}
