//! Layout-agnostic text extraction

use crate::extract::{ExtractError, PlainTextTier};
use std::panic;

/// Plain text through `pdf-extract`
///
/// The parser panics on some malformed inputs; a panic is reported as a
/// parse failure so the next tier still runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractText;

impl PlainTextTier for PdfExtractText {
    fn text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
            .map_err(|_| ExtractError::Parse("pdf-extract panicked".to_string()))?
            .map_err(|e| ExtractError::Parse(e.to_string()))
    }
}
