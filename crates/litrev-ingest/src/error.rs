//! Error types for the ingestion pipeline.

use litrev_core::FormatTag;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index error: {0}")]
    Database(#[from] litrev_db::DbError),

    #[error("Config error: {0}")]
    Config(#[from] litrev_config::ConfigError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] litrev_ollama::OllamaError),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Invalid ignore pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("{format} extraction failed: {message}")]
    Extraction { format: FormatTag, message: String },

    #[error("Metadata error for {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    #[error("No documents could be indexed from {0}")]
    NothingToIndex(PathBuf),

    #[error(
        "Index rebuild failed at {path}: {message}{}",
        if *destructive { " (previous index was removed; re-run the build)" } else { "" }
    )]
    IndexRebuild {
        path: PathBuf,
        message: String,
        destructive: bool,
    },
}

impl IngestError {
    pub(crate) fn extraction(format: FormatTag, message: impl std::fmt::Display) -> Self {
        IngestError::Extraction {
            format,
            message: message.to_string(),
        }
    }

    /// Whether the error left the persisted index removed.
    pub fn is_destructive(&self) -> bool {
        matches!(self, IngestError::IndexRebuild { destructive: true, .. })
    }
}
