//! PDF text extraction.

use super::FormatExtractor;
use crate::error::{IngestError, IngestResult};
use litrev_core::FormatTag;
use tracing::debug;

/// Marker line introducing page `number` (1-based).
pub fn page_marker(number: usize) -> String {
    format!("\n--- Page {} ---\n", number)
}

/// Join per-page text, each page preceded by its marker.
pub fn render_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}{}", page_marker(i + 1), text.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parser for PDF files.
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FormatExtractor for PdfExtractor {
    fn format(&self) -> FormatTag {
        FormatTag::Pdf
    }

    fn extract(&self, bytes: &[u8]) -> IngestResult<String> {
        // pdf-extract panics on some malformed fonts and xref tables
        let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
            .map_err(|_| IngestError::extraction(FormatTag::Pdf, "parser panicked"))?
            .map_err(|e| IngestError::extraction(FormatTag::Pdf, e))?;
        debug!("Extracted {} PDF pages", pages.len());
        Ok(render_pages(&pages))
    }
}
