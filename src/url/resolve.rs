use url::Url;

/// Resolves an anchor href against the page it was found on
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs (same page anchors)
/// - javascript:, mailto:, tel:, data: schemes
/// - hrefs that do not resolve to an HTTP(S) URL
///
/// The fragment of the resolved URL is always removed.
///
/// # Examples
///
/// ```
/// use policy_harvester::url::resolve_href;
/// use url::Url;
///
/// let base = Url::parse("https://example.org/docs/index.html").unwrap();
/// let url = resolve_href("report.pdf#p2", &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.org/docs/report.pdf");
/// ```
pub fn resolve_href(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut url = base_url.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
