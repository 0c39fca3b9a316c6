//! Structural text extraction for HTML documents

use crate::crawler::normalize_whitespace;
use scraper::{ElementRef, Html, Selector};

/// Elements whose content never reaches the output
const HIDDEN_TAGS: [&str; 5] = ["script", "style", "meta", "noscript", "iframe"];

fn is_hidden(name: &str) -> bool {
    HIDDEN_TAGS.contains(&name)
}

/// Converts an HTML document into lines of readable text
///
/// Headings `h1`-`h4` become `# text` preceded by a blank line, list items
/// become `• text`, paragraphs are kept as-is. Everything else, including
/// the `ul`/`ol` containers themselves, produces nothing. Returns None when
/// no text survives.
pub fn html_to_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("h1, h2, h3, h4, p, li").ok()?;

    let mut lines = Vec::new();
    for element in document.select(&selector) {
        if element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_hidden(ancestor.value().name()))
        {
            continue;
        }

        let text = visible_text(element);
        match element.value().name() {
            "h1" | "h2" | "h3" | "h4" => lines.push(format!("\n# {}", text)),
            "li" => lines.push(format!("• {}", text)),
            _ => lines.push(text),
        }
    }

    let joined = lines.join("\n");
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Whitespace-normalized text of an element, skipping hidden descendants
fn visible_text(element: ElementRef<'_>) -> String {
    let root = element.id();
    let fragments = element.descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let hidden = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != root)
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_hidden(ancestor.value().name()));
        if hidden {
            None
        } else {
            Some(&**text)
        }
    });
    normalize_whitespace(fragments)
}
