//! End-to-end build: ingest, enrich, segment, publish.

use crate::cache::TextCache;
use crate::coordinator::{IngestionCoordinator, SkippedFile};
use crate::enrich::MetadataEnricher;
use crate::error::{IngestError, IngestResult};
use crate::progress::ProgressFn;
use crate::publish::{Embedder, IndexPublisher, NoEmbedder, PublishReport};
use crate::segment::{ChunkConfig, ChunkSegmenter};
use litrev_config::{AppPaths, Config};
use litrev_core::{Chunk, EnrichedDocument};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything a build produces before the index is touched.
#[derive(Debug)]
pub struct PreparedBuild {
    pub root: PathBuf,
    pub documents: Vec<EnrichedDocument>,
    pub chunks: Vec<Chunk>,
    pub skipped: Vec<SkippedFile>,
    pub cache_hits: usize,
}

impl PreparedBuild {
    pub fn processed(&self) -> usize {
        self.documents.len()
    }

    /// Number of documents per classification tag.
    pub fn class_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for doc in &self.documents {
            let class = doc
                .document_class()
                .map(|c| c.as_str())
                .unwrap_or("unknown");
            *counts.entry(class.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// Summary of a completed build.
#[derive(Debug)]
pub struct PipelineReport {
    pub processed: usize,
    pub skipped: Vec<SkippedFile>,
    pub cache_hits: usize,
    pub chunks: usize,
    pub class_counts: BTreeMap<String, usize>,
    pub published: PublishReport,
}

/// The full document indexing pipeline.
pub struct Pipeline<E = NoEmbedder> {
    root: PathBuf,
    coordinator: IngestionCoordinator,
    segmenter: ChunkSegmenter,
    publisher: IndexPublisher<E>,
}

impl Pipeline<NoEmbedder> {
    /// Wire every component from configuration.
    pub fn from_config(config: &Config, paths: &AppPaths) -> IngestResult<Self> {
        config.validate()?;

        let cache = TextCache::open(config.cache_dir(paths))?;
        let coordinator = IngestionCoordinator::new(cache, config.ingest.effective_workers())
            .with_ignore_patterns(&config.ingest.ignore_patterns)?;
        let segmenter = ChunkSegmenter::new(ChunkConfig::from(&config.chunking));
        let publisher =
            IndexPublisher::new(config.index_path(paths)).with_batch_size(config.index.batch_size);

        Ok(Self::from_parts(
            config.source_dir(),
            coordinator,
            segmenter,
            publisher,
        ))
    }
}

impl<E: Embedder> Pipeline<E> {
    /// Assemble a pipeline from already-built components.
    pub fn from_parts(
        root: impl Into<PathBuf>,
        coordinator: IngestionCoordinator,
        segmenter: ChunkSegmenter,
        publisher: IndexPublisher<E>,
    ) -> Self {
        Self {
            root: root.into(),
            coordinator,
            segmenter,
            publisher,
        }
    }

    /// Scan `root` instead of the configured source directory.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Compute embeddings with `embedder` when publishing.
    pub fn with_embedder<F: Embedder>(self, embedder: F) -> Pipeline<F> {
        Pipeline {
            root: self.root,
            coordinator: self.coordinator,
            segmenter: self.segmenter,
            publisher: self.publisher.with_embedder(embedder),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn coordinator(&self) -> &IngestionCoordinator {
        &self.coordinator
    }

    pub fn publisher(&self) -> &IndexPublisher<E> {
        &self.publisher
    }

    /// Ingest, enrich and segment without touching the index.
    pub async fn prepare(&self, progress: Option<&ProgressFn<'_>>) -> IngestResult<PreparedBuild> {
        let root = self
            .root
            .canonicalize()
            .map_err(|_| IngestError::FileNotFound(self.root.clone()))?;

        let mut ingested = self.coordinator.ingest(&root, progress).await?;
        // Completion order is arbitrary; sort so chunk ids are stable across runs
        ingested
            .documents
            .sort_by(|a, b| a.source.path.cmp(&b.source.path));

        let documents = MetadataEnricher::new(&root).enrich_all(ingested.documents, progress);
        let chunks = self.segmenter.segment(&documents, progress);

        Ok(PreparedBuild {
            root,
            documents,
            chunks,
            skipped: ingested.skipped,
            cache_hits: ingested.cache_hits,
        })
    }

    /// Run the whole pipeline and replace the index.
    ///
    /// Refuses to publish when no document produced any chunk, leaving the
    /// existing index in place.
    pub async fn run(&self, progress: Option<&ProgressFn<'_>>) -> IngestResult<PipelineReport> {
        let prepared = self.prepare(progress).await?;
        if prepared.chunks.is_empty() {
            return Err(IngestError::NothingToIndex(prepared.root));
        }

        let published = self.publisher.publish(&prepared.chunks, progress).await?;
        info!(
            "Build complete: {} documents, {} skipped, {} chunks",
            prepared.processed(),
            prepared.skipped.len(),
            prepared.chunks.len()
        );

        Ok(PipelineReport {
            processed: prepared.processed(),
            class_counts: prepared.class_counts(),
            skipped: prepared.skipped,
            cache_hits: prepared.cache_hits,
            chunks: prepared.chunks.len(),
            published,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &Path) -> (Config, AppPaths) {
        let paths = AppPaths::with_dirs(dir.join("config"), dir.join("data"));
        let mut config = Config::default();
        config.ingest.source_dir = dir.join("docs").to_string_lossy().into_owned();
        config.ingest.max_workers = 2;
        (config, paths)
    }

    #[test]
    fn test_from_config_rejects_invalid_chunking() {
        let dir = tempdir().unwrap();
        let (mut config, paths) = config_in(dir.path());
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(matches!(
            Pipeline::from_config(&config, &paths),
            Err(IngestError::Config(_))
        ));
    }

    #[test]
    fn test_from_config_locations() {
        let dir = tempdir().unwrap();
        let (config, paths) = config_in(dir.path());
        let pipeline = Pipeline::from_config(&config, &paths).unwrap();

        assert_eq!(pipeline.root(), dir.path().join("docs"));
        assert_eq!(
            pipeline.publisher().index_path(),
            dir.path().join("data").join("index.db")
        );
        assert!(dir.path().join("data").join("document_cache").is_dir());
        assert!(!pipeline.publisher().embeds());
    }

    #[tokio::test]
    async fn test_missing_root() {
        let dir = tempdir().unwrap();
        let (config, paths) = config_in(dir.path());
        let err = Pipeline::from_config(&config, &paths)
            .unwrap()
            .prepare(None)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_run_with_nothing_to_index_keeps_index() {
        let dir = tempdir().unwrap();
        let (config, paths) = config_in(dir.path());
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        let index = config.index_path(&paths);
        std::fs::create_dir_all(index.parent().unwrap()).unwrap();
        std::fs::write(&index, b"previous").unwrap();

        let err = Pipeline::from_config(&config, &paths)
            .unwrap()
            .run(None)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NothingToIndex(_)));
        assert_eq!(std::fs::read(&index).unwrap(), b"previous");
    }
}
