//! Litrev Ingest - Document ingestion and indexing pipeline.
//!
//! This crate provides:
//! - Content fingerprinting and an on-disk extracted-text cache
//! - Text extraction for PDF, DOCX and legacy DOC files
//! - Metadata enrichment and document classification
//! - Parallel ingestion of a directory tree
//! - Overlapping, page-aware chunking
//! - Publishing chunks into a freshly rebuilt index

mod cache;
mod coordinator;
mod enrich;
mod error;
pub mod extract;
mod hasher;
mod pipeline;
mod progress;
mod publish;
mod segment;

pub use cache::{CacheStats, TextCache};
pub use coordinator::{FileOutcome, IngestReport, IngestionCoordinator, RawDocument, SkippedFile};
pub use enrich::{classify, MetadataEnricher};
pub use error::{IngestError, IngestResult};
pub use hasher::{fingerprint, fingerprint_bytes};
pub use pipeline::{Pipeline, PipelineReport, PreparedBuild};
pub use progress::{Phase, ProgressEvent, ProgressFn};
pub use publish::{Embedder, IndexPublisher, NoEmbedder, PublishReport};
pub use segment::{ChunkConfig, ChunkSegmenter, DEFAULT_SEPARATORS};
