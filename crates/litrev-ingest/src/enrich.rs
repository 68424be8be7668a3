//! Metadata enrichment and document classification.

use crate::coordinator::RawDocument;
use crate::error::{IngestError, IngestResult};
use crate::extract::DocxStructure;
use crate::progress::{report, Phase, ProgressFn};
use litrev_core::{keys, DocumentClass, EnrichedDocument, FormatTag, Metadata};
use lopdf::Object;
use once_cell::sync::Lazy;
use regex::RegexSet;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Only the start of a document is inspected when classifying.
const CLASSIFY_SAMPLE_CHARS: usize = 5000;

static CLASS_RULES: Lazy<Vec<(DocumentClass, RegexSet)>> = Lazy::new(|| {
    let rule = |class, patterns: &[&str]| {
        let patterns: Vec<String> = patterns.iter().map(|p| format!(r"\b{}\b", p)).collect();
        (class, RegexSet::new(&patterns).expect("valid classification regex"))
    };
    vec![
        rule(
            DocumentClass::ResearchPaper,
            &[
                "abstract",
                "introduction",
                "methodology",
                "results",
                "discussion",
                "conclusion",
                "references",
                "citation",
                "literature review",
            ],
        ),
        rule(
            DocumentClass::Report,
            &["report", "findings", "executive summary", "quarterly", "annual"],
        ),
        rule(
            DocumentClass::Guide,
            &[
                "manual",
                "guide",
                "instructions",
                "tutorial",
                r"step[-\s]by[-\s]step",
                r"how[-\s]to",
            ],
        ),
    ]
});

/// Coarse content category from keyword cues in the first 5000 characters.
///
/// Categories are checked in priority order: research paper, report, guide.
pub fn classify(content: &str) -> DocumentClass {
    let sample: String = content.chars().take(CLASSIFY_SAMPLE_CHARS).collect();
    let sample = sample.to_lowercase();
    CLASS_RULES
        .iter()
        .find(|(_, set)| set.is_match(&sample))
        .map(|(class, _)| *class)
        .unwrap_or(DocumentClass::Document)
}

/// Derives descriptive metadata for extracted documents.
#[derive(Debug, Clone)]
pub struct MetadataEnricher {
    root: PathBuf,
}

impl MetadataEnricher {
    /// Create an enricher computing relative paths against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Attach common, format-specific and classification metadata.
    ///
    /// Format-specific failures are logged and leave only the common fields.
    pub fn enrich(&self, raw: RawDocument) -> EnrichedDocument {
        let path = raw.source.path.clone();
        let mut metadata = self.common_fields(&raw);

        let format_fields = match raw.source.format {
            FormatTag::Pdf => pdf_fields(&path),
            FormatTag::Docx => docx_fields(&path),
            FormatTag::Doc => Ok(Metadata::new()),
        };
        match format_fields {
            Ok(fields) => metadata.extend(fields),
            Err(e) => warn!("Metadata extraction failed for {:?}: {}", path, e),
        }

        let class = classify(&raw.text);
        debug!("Classified {:?} as {}", path, class);
        metadata.insert(keys::DOCUMENT_TYPE.to_string(), json!(class.as_str()));

        EnrichedDocument::new(path, raw.text, metadata)
    }

    /// Enrich every document in order, reporting progress per document.
    pub fn enrich_all(
        &self,
        documents: Vec<RawDocument>,
        progress: Option<&ProgressFn<'_>>,
    ) -> Vec<EnrichedDocument> {
        documents
            .into_iter()
            .map(|raw| {
                let doc = self.enrich(raw);
                report(progress, Phase::Enrich, Some(&doc.source), true);
                doc
            })
            .collect()
    }

    fn relative_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => file_name(path),
        }
    }

    fn common_fields(&self, raw: &RawDocument) -> Metadata {
        let path = &raw.source.path;
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        let mut metadata = Metadata::new();
        metadata.insert(keys::SOURCE.to_string(), json!(path.to_string_lossy()));
        metadata.insert(keys::FILENAME.to_string(), json!(file_name(path)));
        metadata.insert(keys::EXTENSION.to_string(), json!(extension));
        metadata.insert(
            keys::RELATIVE_PATH.to_string(),
            json!(self.relative_path(path)),
        );
        metadata.insert(
            keys::FILE_SIZE_BYTES.to_string(),
            json!(raw.source.size_bytes),
        );
        metadata.insert(
            keys::CONTENT_HASH.to_string(),
            json!(raw.fingerprint.to_hex()),
        );
        metadata
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn metadata_error(path: &Path, message: impl std::fmt::Display) -> IngestError {
    IngestError::Metadata {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, else PDFDocEncoding).
fn decode_pdf_string(bytes: &[u8]) -> String {
    let text = if let Some(rest) = bytes.strip_prefix(&[0xfe, 0xff]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(rest) = bytes.strip_prefix(&[0xef, 0xbb, 0xbf]) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        bytes.iter().map(|&b| b as char).collect()
    };
    text.trim_end_matches('\0').to_string()
}

fn info_dictionary(doc: &lopdf::Document) -> Option<&lopdf::Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn pdf_fields(path: &Path) -> IngestResult<Metadata> {
    let bytes = std::fs::read(path)?;
    let doc = lopdf::Document::load_mem(&bytes).map_err(|e| metadata_error(path, e))?;
    let info = info_dictionary(&doc);

    let mut metadata = Metadata::new();
    metadata.insert(keys::PAGE_COUNT.to_string(), json!(doc.get_pages().len()));

    for (entry, key) in [
        ("Title", "pdf_title"),
        ("Author", "pdf_author"),
        ("Subject", "pdf_subject"),
        ("Creator", "pdf_creator"),
        ("Producer", "pdf_producer"),
    ] {
        let value = info
            .and_then(|dict| dict.get(entry.as_bytes()).ok())
            .and_then(|obj| match obj {
                Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
                _ => None,
            })
            .unwrap_or_default();
        metadata.insert(key.to_string(), json!(value));
    }
    Ok(metadata)
}

fn docx_fields(path: &Path) -> IngestResult<Metadata> {
    let bytes = std::fs::read(path)?;
    let structure = DocxStructure::parse(&bytes).map_err(|e| metadata_error(path, e))?;
    let props = &structure.properties;

    let mut metadata = Metadata::new();
    metadata.insert("docx_title".to_string(), json!(props.title));
    metadata.insert("docx_author".to_string(), json!(props.author));
    metadata.insert("docx_subject".to_string(), json!(props.subject));
    metadata.insert(
        keys::PARAGRAPH_COUNT.to_string(),
        json!(structure.paragraph_count()),
    );
    metadata.insert(keys::TABLE_COUNT.to_string(), json!(structure.table_count()));
    for (level, count) in structure.heading_counts() {
        metadata.insert(keys::heading_count(level), json!(count));
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint_bytes;
    use litrev_core::SourceFile;
    use tempfile::tempdir;

    fn raw(path: &Path, format: FormatTag, text: &str) -> RawDocument {
        RawDocument {
            source: SourceFile::new(path, 42, format),
            fingerprint: fingerprint_bytes(text.as_bytes()),
            text: text.to_string(),
            from_cache: false,
        }
    }

    #[test]
    fn test_classify_priority_order() {
        assert_eq!(
            classify("Abstract\nThis quarterly update..."),
            DocumentClass::ResearchPaper
        );
        assert_eq!(
            classify("Executive Summary of the quarterly numbers"),
            DocumentClass::Report
        );
        assert_eq!(classify("A step-by-step tutorial"), DocumentClass::Guide);
        assert_eq!(classify("How to install"), DocumentClass::Guide);
        assert_eq!(classify("Meeting notes, nothing else"), DocumentClass::Document);
        assert_eq!(classify(""), DocumentClass::Document);
    }

    #[test]
    fn test_classify_word_boundaries() {
        // "reports" and "guidelines" are not whole-word matches
        assert_eq!(classify("several reports and guidelines"), DocumentClass::Document);
    }

    #[test]
    fn test_classify_only_reads_prefix() {
        let text = format!("{}abstract", "x ".repeat(CLASSIFY_SAMPLE_CHARS));
        assert_eq!(classify(&text), DocumentClass::Document);
    }

    #[test]
    fn test_common_fields_for_unreadable_pdf() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("papers");
        std::fs::create_dir(&sub).unwrap();
        let path = sub.join("Survey.PDF");
        std::fs::write(&path, b"not really a pdf").unwrap();

        let enricher = MetadataEnricher::new(dir.path());
        let doc = enricher.enrich(raw(&path, FormatTag::Pdf, "Introduction to things"));

        let md = &doc.metadata;
        assert_eq!(md[keys::FILENAME], json!("Survey.PDF"));
        assert_eq!(md[keys::EXTENSION], json!(".pdf"));
        assert_eq!(
            md[keys::RELATIVE_PATH],
            json!(Path::new("papers").join("Survey.PDF").to_string_lossy())
        );
        assert_eq!(md[keys::FILE_SIZE_BYTES], json!(42));
        assert_eq!(md[keys::DOCUMENT_TYPE], json!("research_paper"));
        assert!(md.get(keys::PAGE_COUNT).is_none());
        assert_eq!(doc.document_class(), Some(DocumentClass::ResearchPaper));
    }

    #[test]
    fn test_relative_path_outside_root_falls_back_to_filename() {
        let enricher = MetadataEnricher::new("/library");
        assert_eq!(
            enricher.relative_path(Path::new("/elsewhere/notes.doc")),
            "notes.doc"
        );
    }

    #[test]
    fn test_docx_fields() {
        use crate::extract::docx_tests::{build_docx, paragraph};

        let dir = tempdir().unwrap();
        let path = dir.path().join("guide.docx");
        let body = [
            paragraph("Setup", Some("Heading1")),
            paragraph("Install the tool.", None),
        ]
        .concat();
        std::fs::write(&path, build_docx(&body, true)).unwrap();

        let doc = MetadataEnricher::new(dir.path())
            .enrich(raw(&path, FormatTag::Docx, "Installation manual"));
        let md = &doc.metadata;
        assert_eq!(md["docx_title"], json!("Field Guide"));
        assert_eq!(md["docx_author"], json!("A. Author"));
        assert_eq!(md[keys::PARAGRAPH_COUNT], json!(2));
        assert_eq!(md[keys::TABLE_COUNT], json!(0));
        assert_eq!(md["heading1_count"], json!(1));
        assert_eq!(md[keys::DOCUMENT_TYPE], json!("guide"));
    }

    #[test]
    fn test_decode_pdf_strings() {
        assert_eq!(decode_pdf_string(b"Plain Title"), "Plain Title");
        assert_eq!(
            decode_pdf_string(&[0xfe, 0xff, 0x00, 0x48, 0x00, 0x69]),
            "Hi"
        );
        assert_eq!(decode_pdf_string(&[0xe9]), "é");
    }

    #[test]
    fn test_enrich_all_reports_progress() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dir = tempdir().unwrap();
        let path = dir.path().join("x.doc");
        std::fs::write(&path, b"x").unwrap();
        let seen = AtomicUsize::new(0);
        let cb: &ProgressFn<'_> = &|_| {
            seen.fetch_add(1, Ordering::SeqCst);
        };

        let docs = MetadataEnricher::new(dir.path()).enrich_all(
            vec![raw(&path, FormatTag::Doc, "a"), raw(&path, FormatTag::Doc, "b")],
            Some(cb),
        );
        assert_eq!(docs.len(), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
