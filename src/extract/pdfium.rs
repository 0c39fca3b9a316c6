//! Process-wide pdfium binding shared by the structured and OCR tiers

use crate::extract::ExtractError;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// Binds pdfium on first use
///
/// `library_dir` names the directory holding the platform's pdfium shared
/// library; the system library is used when it is None. A failed binding
/// is retried on the next call.
pub(crate) fn pdfium(library_dir: Option<&str>) -> Result<&'static Pdfium, ExtractError> {
    PDFIUM.get_or_try_init(|| {
        let bindings = match library_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| ExtractError::Backend(format!("failed to bind pdfium: {:?}", e)))?;
        Ok(Pdfium::new(bindings))
    })
}

/// Loads a document from memory, mapping failures to a parse error
pub(crate) fn load_document<'a>(
    pdfium: &'a Pdfium,
    bytes: &'a [u8],
) -> Result<PdfDocument<'a>, ExtractError> {
    pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ExtractError::Parse(format!("pdfium could not open the document: {:?}", e)))
}
