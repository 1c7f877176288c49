//! Native PDF text via `lopdf`.

use lopdf::Document;
use tracing::debug;

use super::error::ExtractionError;
use super::types::DocumentFormat;

/// Text layer of one PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPage {
    /// One-based page number, as `pdftoppm` expects it.
    pub number: u32,
    pub text: String,
}

/// Reads every page's text layer in page order.
///
/// A page whose content stream can't be decoded yields empty text instead of failing the
/// document, so it can still go through OCR.
pub fn read_pages(bytes: &[u8]) -> Result<Vec<PdfPage>, ExtractionError> {
    let document =
        Document::load_mem(bytes).map_err(|e| ExtractionError::corrupt(DocumentFormat::Pdf, e))?;

    if document.is_encrypted() {
        return Err(ExtractionError::corrupt(
            DocumentFormat::Pdf,
            "document is encrypted",
        ));
    }

    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err(ExtractionError::NoSlides);
    }

    let pages = page_numbers
        .into_iter()
        .map(|number| {
            let text = match document.extract_text(&[number]) {
                Ok(text) => normalize_whitespace(&text),
                Err(e) => {
                    debug!(page = number, error = %e, "PDF page text extraction failed");
                    String::new()
                }
            };
            PdfPage { number, text }
        })
        .collect();

    Ok(pages)
}

/// Collapses runs of blank lines and trailing spaces left by PDF text operators.
fn normalize_whitespace(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();
    lines.join("\n")
}
