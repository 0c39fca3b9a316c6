//! Listing page parsing
//!
//! This module extracts anchors from listing pages and locates the
//! pagination control that leads to the next page.

use scraper::{Html, Selector};

/// An `<a href>` element found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Raw href attribute, unresolved
    pub href: String,
    /// Visible text, whitespace-normalized
    pub text: String,
}

/// Extracts every anchor with an href, in document order
///
/// # Example
///
/// ```
/// use policy_harvester::crawler::parse_anchors;
///
/// let html = r#"<a href="/a.pdf">Annual <b>report</b></a><a>no href</a>"#;
/// let anchors = parse_anchors(html);
/// assert_eq!(anchors.len(), 1);
/// assert_eq!(anchors[0].text, "Annual report");
/// ```
pub fn parse_anchors(html: &str) -> Vec<Anchor> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            Some(Anchor {
                href: href.to_string(),
                text: normalize_whitespace(element.text()),
            })
        })
        .collect()
}

/// Returns true if the control text reads as a "next page" control
pub fn is_next_control(text: &str) -> bool {
    text.to_lowercase().contains("next")
}

/// The first anchor that looks like a "next page" control
pub fn find_next_anchor(anchors: &[Anchor]) -> Option<&Anchor> {
    anchors.iter().find(|anchor| is_next_control(&anchor.text))
}

/// Joins text fragments with single spaces, dropping empty runs
pub(crate) fn normalize_whitespace<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    fragments
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
