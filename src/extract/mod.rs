//! Text extraction pipeline
//!
//! PDF bytes go through three tiers in order, stopping at the first one
//! that yields non-empty text:
//!
//! 1. the structured text layer (keeps font sizes, so headings survive)
//! 2. a layout-agnostic plain text extractor
//! 3. OCR over rasterized pages
//!
//! HTML documents skip the tiers and are reduced to headings, paragraphs
//! and list items. The chosen text is summarized, keyword-highlighted and
//! rendered into the stored document format.

#[cfg(test)]
pub(crate) mod fixtures;
mod html;
mod ocr;
mod pdfium;
mod plain;
mod postprocess;
mod structured;

pub use html::html_to_text;
pub use ocr::TesseractOcr;
pub use plain::PdfExtractText;
pub use postprocess::{summarize, truncate_chars, Highlighter};
pub use structured::PdfiumTextLayer;

use crate::config::{resolve_tesseract, ExtractionConfig};
use crate::url::LinkKind;
use crate::{ConfigError, ConfigResult};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failures inside a single extraction tier
///
/// These never escape the pipeline: a failing tier falls through to the
/// next one.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Backend unavailable: {0}")]
    Backend(String),
}

/// Which strategy produced the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Structured,
    PlainText,
    Ocr,
    Html,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Structured => "structured",
            Self::PlainText => "plain-text",
            Self::Ocr => "ocr",
            Self::Html => "html",
        };
        write!(f, "{}", name)
    }
}

/// A run of text from the PDF text layer
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    /// Font size in points
    pub font_size: f32,
}

/// Tier 1: text objects with their font sizes
pub trait StructuredTextTier: Send + Sync {
    fn spans(&self, bytes: &[u8]) -> Result<Vec<TextSpan>, ExtractError>;
}

/// Tier 2: the document's text without structure
pub trait PlainTextTier: Send + Sync {
    fn text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Tier 3: recognized text, one entry per page
///
/// A page that cannot be read yields an empty entry rather than an error.
pub trait OcrTier: Send + Sync {
    fn pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError>;
}

/// Extracted text ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub tier: Tier,
    /// Only filled by the structured tier
    pub headings: Vec<String>,
    pub summary: String,
    pub full_text: String,
}

impl ExtractionResult {
    /// Renders the stored document format
    pub fn render(&self) -> String {
        let body = format!(
            "SUMMARY:\n{}\n\nFULL TEXT:\n{}",
            self.summary, self.full_text
        );
        match self.tier {
            Tier::Structured => format!("HEADINGS:\n{}\n\n{}", self.headings.join(", "), body),
            _ => body,
        }
    }

    /// Renders and cuts the result to at most `max_chars` characters
    pub fn render_truncated(&self, max_chars: usize) -> String {
        truncate_chars(&self.render(), max_chars).to_string()
    }
}

/// Post-processing settings applied to whichever tier wins
#[derive(Debug, Clone)]
pub struct PostProcess {
    pub heading_font_size: f32,
    pub summary_sentences: usize,
    pub highlighter: Highlighter,
}

impl PostProcess {
    pub fn from_config(config: &ExtractionConfig) -> ConfigResult<Self> {
        let highlighter = Highlighter::new(&config.keywords)
            .map_err(|e| ConfigError::Validation(format!("invalid keywords: {}", e)))?;
        Ok(Self {
            heading_font_size: config.heading_font_size,
            summary_sentences: config.summary_sentences,
            highlighter,
        })
    }

    fn finish(&self, tier: Tier, headings: Vec<String>, text: &str) -> ExtractionResult {
        let summary = summarize(text, self.summary_sentences);
        ExtractionResult {
            tier,
            headings,
            summary: self.highlighter.highlight(&summary).trim().to_string(),
            full_text: self.highlighter.highlight(text).trim().to_string(),
        }
    }
}

/// The three-tier extraction pipeline
pub struct Pipeline {
    structured: Box<dyn StructuredTextTier>,
    plain: Box<dyn PlainTextTier>,
    ocr: Box<dyn OcrTier>,
    post: PostProcess,
}

impl Pipeline {
    pub fn new(
        structured: Box<dyn StructuredTextTier>,
        plain: Box<dyn PlainTextTier>,
        ocr: Box<dyn OcrTier>,
        post: PostProcess,
    ) -> Self {
        Self {
            structured,
            plain,
            ocr,
            post,
        }
    }

    /// Builds the production pipeline
    ///
    /// Fails when the tesseract binary cannot be found, so a batch never
    /// starts with a broken OCR tier.
    pub fn from_config(config: &ExtractionConfig) -> ConfigResult<Self> {
        let tesseract = resolve_tesseract(config)?;
        debug!("Using tesseract at {}", tesseract.display());

        Ok(Self::new(
            Box::new(PdfiumTextLayer::new(config.pdfium_library.clone())),
            Box::new(PdfExtractText),
            Box::new(TesseractOcr::new(
                config.pdfium_library.clone(),
                tesseract,
                config.ocr_dpi,
                config.ocr_language.clone(),
                Duration::from_secs(config.ocr_timeout_secs),
            )),
            PostProcess::from_config(config)?,
        ))
    }

    /// Extracts text from a fetched document
    ///
    /// Returns None when no tier produced any text. This is blocking work;
    /// async callers run it under `spawn_blocking`.
    pub fn extract(&self, bytes: &[u8], kind: LinkKind) -> Option<ExtractionResult> {
        match kind {
            LinkKind::Html => {
                let text = html_to_text(&String::from_utf8_lossy(bytes))?;
                Some(self.post.finish(Tier::Html, Vec::new(), &text))
            }
            LinkKind::Pdf => {
                let (tier, headings, text) = self.pdf_text(bytes)?;
                Some(self.post.finish(tier, headings, &text))
            }
        }
    }

    /// Text of a document without summary or highlighting
    pub fn raw_text(&self, bytes: &[u8], kind: LinkKind) -> Option<String> {
        match kind {
            LinkKind::Html => html_to_text(&String::from_utf8_lossy(bytes)),
            LinkKind::Pdf => self.pdf_text(bytes).map(|(_, _, text)| text),
        }
    }

    fn pdf_text(&self, bytes: &[u8]) -> Option<(Tier, Vec<String>, String)> {
        match self.structured.spans(bytes) {
            Ok(spans) => {
                let text = spans
                    .iter()
                    .map(|span| format!("{} ", span.text))
                    .collect::<String>();
                if !text.trim().is_empty() {
                    let headings = spans
                        .iter()
                        .filter(|span| span.font_size > self.post.heading_font_size)
                        .map(|span| span.text.trim())
                        .filter(|t| t.chars().count() > 3)
                        .map(str::to_string)
                        .collect();
                    return Some((Tier::Structured, headings, text));
                }
                debug!("Structured tier found no text");
            }
            Err(e) => debug!("Structured tier failed: {}", e),
        }

        match self.plain.text(bytes) {
            Ok(text) if !text.trim().is_empty() => {
                return Some((Tier::PlainText, Vec::new(), text));
            }
            Ok(_) => debug!("Plain text tier found no text"),
            Err(e) => debug!("Plain text tier failed: {}", e),
        }

        match self.ocr.pages(bytes) {
            Ok(pages) => {
                let text = pages
                    .iter()
                    .enumerate()
                    .map(|(i, page)| format!("\n\n--- Page {} ---\n{}", i + 1, page.trim()))
                    .collect::<String>();
                // Empty pages still leave markers behind
                if pages.iter().any(|page| !page.trim().is_empty()) {
                    return Some((Tier::Ocr, Vec::new(), text.trim().to_string()));
                }
                debug!("OCR tier found no text");
            }
            Err(e) => debug!("OCR tier failed: {}", e),
        }

        None
    }
}
