//! URL handling for link discovery
//!
//! This module resolves anchor hrefs, confines them to the seed's origin and
//! decides which of them point at policy documents worth extracting.

mod origin;
mod resolve;

pub use origin::{parse_seed_url, SeedOrigin};
pub use resolve::resolve_href;

use std::fmt;
use url::Url;

/// Kind of document a discovered link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Pdf,
    Html,
}

impl LinkKind {
    /// Derives the kind from a URL path suffix
    pub fn from_url(url: &Url) -> Self {
        if url.path().to_lowercase().ends_with(".pdf") {
            Self::Pdf
        } else {
            Self::Html
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Html => "html",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pdf" => Some(Self::Pdf),
            "html" => Some(Self::Html),
            _ => None,
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A link that qualified as a document during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    pub url: Url,
    pub kind: LinkKind,
}

/// Returns true if an absolute, fragment-free URL looks like a canonical
/// document link
///
/// Documents end in `.pdf`, `.html` or `.htm` (any case), or live under a
/// `/publications/` path segment (exact case). Any query string, even an
/// empty one, marks the URL as dynamic and disqualifies it.
pub fn is_document_url(url: &Url) -> bool {
    if url.query().is_some() || url.fragment().is_some() {
        return false;
    }

    let lower = url.as_str().to_lowercase();
    lower.ends_with(".pdf")
        || lower.ends_with(".html")
        || lower.ends_with(".htm")
        || url.path().contains("/publications/")
}

/// Resolves an anchor href and returns it if it qualifies as a document link
///
/// # Arguments
///
/// * `href` - Raw href attribute value
/// * `page_url` - URL of the page the anchor was found on
/// * `origin` - The crawl job's seed origin
///
/// # Examples
///
/// ```
/// use policy_harvester::url::{qualify_document_link, LinkKind, SeedOrigin};
/// use url::Url;
///
/// let page = Url::parse("https://example.org/docs").unwrap();
/// let origin = SeedOrigin::from_url(&page).unwrap();
///
/// let link = qualify_document_link("/docs/a.pdf", &page, &origin).unwrap();
/// assert_eq!(link.kind, LinkKind::Pdf);
/// assert!(qualify_document_link("/docs/b.html?x=1", &page, &origin).is_none());
/// ```
pub fn qualify_document_link(
    href: &str,
    page_url: &Url,
    origin: &SeedOrigin,
) -> Option<DocumentLink> {
    let url = resolve_href(href, page_url)?;

    if !origin.contains(&url) || !is_document_url(&url) {
        return None;
    }

    let kind = LinkKind::from_url(&url);
    Some(DocumentLink { url, kind })
}
