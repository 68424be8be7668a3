//! Core domain types for Litrev.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Descriptive attributes attached to documents and chunks.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Identifier assigned to chunks, global across one build.
pub type ChunkId = u64;

/// Well-known metadata keys shared by the ingestion pipeline and the index.
pub mod keys {
    pub const SOURCE: &str = "source";
    pub const FILENAME: &str = "filename";
    pub const EXTENSION: &str = "extension";
    pub const RELATIVE_PATH: &str = "relative_path";
    pub const FILE_SIZE_BYTES: &str = "file_size_bytes";
    pub const CONTENT_HASH: &str = "content_hash";
    pub const DOCUMENT_TYPE: &str = "document_type";
    pub const PAGE_COUNT: &str = "page_count";
    pub const PARAGRAPH_COUNT: &str = "paragraph_count";
    pub const TABLE_COUNT: &str = "table_count";
    pub const CHUNK_ID: &str = "chunk_id";
    pub const START_INDEX: &str = "start_index";
    pub const PAGE: &str = "page";

    /// Key for the number of headings at a given level, e.g. `heading2_count`.
    pub fn heading_count(level: u32) -> String {
        format!("heading{}_count", level)
    }
}

/// Container formats the ingestion pipeline knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    /// Page-oriented document.
    Pdf,
    /// Structured word-processing document (OOXML).
    Docx,
    /// Legacy word-processing document, read through a fallback extractor.
    Doc,
}

impl FormatTag {
    pub const ALL: [FormatTag; 3] = [FormatTag::Pdf, FormatTag::Docx, FormatTag::Doc];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::Pdf => "pdf",
            FormatTag::Docx => "docx",
            FormatTag::Doc => "doc",
        }
    }

    /// Detect the format from a file extension (case-insensitive, no dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(FormatTag::Pdf),
            "docx" => Some(FormatTag::Docx),
            "doc" => Some(FormatTag::Doc),
            _ => None,
        }
    }

    /// Detect the format of a path from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for FormatTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A discovered input file. Treated as immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub format: FormatTag,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64, format: FormatTag) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            format,
        }
    }
}

/// SHA-256 digest over the full byte content of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentFingerprint([u8; 32]);

impl ContentFingerprint {
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical lowercase hex form, used for cache file names.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ContentFingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = |reason: String| Error::BadFingerprint {
            input: s.to_string(),
            reason,
        };
        let bytes = hex::decode(s).map_err(|e| malformed(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| malformed(format!("expected 32 bytes, got {}", v.len())))?;
        Ok(Self(bytes))
    }
}

impl Serialize for ContentFingerprint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentFingerprint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Coarse content category assigned during enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentClass {
    ResearchPaper,
    Report,
    Guide,
    Document,
}

impl DocumentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentClass::ResearchPaper => "research_paper",
            DocumentClass::Report => "report",
            DocumentClass::Guide => "guide",
            DocumentClass::Document => "document",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "research_paper" => Some(DocumentClass::ResearchPaper),
            "report" => Some(DocumentClass::Report),
            "guide" => Some(DocumentClass::Guide),
            "document" => Some(DocumentClass::Document),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extracted text plus derived metadata for one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedDocument {
    pub source: PathBuf,
    pub text: String,
    pub metadata: Metadata,
}

impl EnrichedDocument {
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            metadata,
        }
    }

    /// The classification tag, if enrichment assigned one.
    pub fn document_class(&self) -> Option<DocumentClass> {
        self.metadata
            .get(keys::DOCUMENT_TYPE)
            .and_then(|v| v.as_str())
            .and_then(DocumentClass::from_str)
    }
}

/// A bounded slice of a document's text with provenance metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub content: String,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(chunk_id: ChunkId, content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            chunk_id,
            content: content.into(),
            metadata,
        }
    }

    /// Page number recovered from an embedded page marker.
    pub fn page(&self) -> Option<u32> {
        self.metadata
            .get(keys::PAGE)
            .and_then(|v| v.as_u64())
            .map(|p| p as u32)
    }

    /// Character offset of this chunk within its parent text.
    pub fn start_index(&self) -> Option<usize> {
        self.metadata
            .get(keys::START_INDEX)
            .and_then(|v| v.as_u64())
            .map(|i| i as usize)
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get(keys::SOURCE).and_then(|v| v.as_str())
    }
}

/// Summary statistics for a persisted index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_chunks: i64,
    pub total_sources: i64,
    pub embedded_chunks: i64,
    pub chunks_by_type: std::collections::HashMap<String, i64>,
    pub built_at: Option<String>,
    pub embedding_model: Option<String>,
}
