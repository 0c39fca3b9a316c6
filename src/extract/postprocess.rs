//! Summary excerpt, keyword highlighting and truncation

use regex::Regex;

/// Returns the first `sentences` sentences of `text`, joined by a space
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace. The result is
/// trimmed.
pub fn summarize(text: &str, sentences: usize) -> String {
    split_sentences(text)
        .into_iter()
        .take(sentences)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        match chars.peek() {
            Some(&(_, next)) if next.is_whitespace() => {
                let end = i + c.len_utf8();
                sentences.push(&text[start..end]);
                // Skip the whitespace run separating sentences
                while let Some(&(_, ws)) = chars.peek() {
                    if !ws.is_whitespace() {
                        break;
                    }
                    chars.next();
                }
                start = chars.peek().map(|&(j, _)| j).unwrap_or(text.len());
            }
            _ => {}
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Wraps whole-word keyword matches in `**` markers
#[derive(Debug, Clone)]
pub struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    /// Builds a case-insensitive whole-word matcher for the keywords
    ///
    /// An empty keyword list produces a highlighter that leaves text alone.
    pub fn new(keywords: &[String]) -> Result<Self, regex::Error> {
        let mut words: Vec<&str> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        if words.is_empty() {
            return Ok(Self { pattern: None });
        }
        // Longest first so "policy makers" wins over "policy"
        words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));

        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b({})\b", alternation))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Highlights keyword matches, keeping the matched text's case
    pub fn highlight(&self, text: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(text, "**${1}**").into_owned(),
            None => text.to_string(),
        }
    }
}

/// Truncates to at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
