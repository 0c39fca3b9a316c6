//! Text-layer extraction that keeps font sizes

use crate::extract::pdfium::{load_document, pdfium};
use crate::extract::{ExtractError, StructuredTextTier, TextSpan};
use pdfium_render::prelude::PdfPageObjectsCommon;

/// Reads every text object of every page through pdfium
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextLayer {
    library_dir: Option<String>,
}

impl PdfiumTextLayer {
    pub fn new(library_dir: Option<String>) -> Self {
        Self { library_dir }
    }
}

impl StructuredTextTier for PdfiumTextLayer {
    fn spans(&self, bytes: &[u8]) -> Result<Vec<TextSpan>, ExtractError> {
        let pdfium = pdfium(self.library_dir.as_deref())?;
        let document = load_document(pdfium, bytes)?;

        let mut spans = Vec::new();
        for page in document.pages().iter() {
            for object in page.objects().iter() {
                if let Some(text_object) = object.as_text_object() {
                    spans.push(TextSpan {
                        text: text_object.text(),
                        font_size: text_object.scaled_font_size().value,
                    });
                }
            }
        }
        Ok(spans)
    }
}
