//! Format-specific text extraction.
//!
//! Every extractor turns the raw bytes of one file into plain text with
//! inline structural markers:
//! - PDF pages are introduced by `--- Page N ---` lines
//! - DOCX headings become `#`-prefixed lines, tables become ` | `-separated rows

mod docx;
mod legacy;
mod pdf;

pub use docx::{DocxBlock, DocxExtractor, DocxProperties, DocxStructure, Heading};
pub use legacy::{scan_printable_text, LegacyDocExtractor};
pub use pdf::{page_marker, render_pages, PdfExtractor};

#[cfg(test)]
pub(crate) use docx::tests as docx_tests;

use crate::error::IngestResult;
use litrev_core::FormatTag;

/// Trait for format extractors.
pub trait FormatExtractor: Send + Sync {
    /// The format this extractor reads.
    fn format(&self) -> FormatTag;

    /// Extract text from the full content of a file.
    fn extract(&self, bytes: &[u8]) -> IngestResult<String>;
}

/// Get the extractor for a format.
pub fn extractor_for(format: FormatTag) -> Box<dyn FormatExtractor> {
    match format {
        FormatTag::Pdf => Box::new(PdfExtractor::new()),
        FormatTag::Docx => Box::new(DocxExtractor::new()),
        FormatTag::Doc => Box::new(LegacyDocExtractor::new()),
    }
}
