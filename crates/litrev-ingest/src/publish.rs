//! Rebuilds the persisted index from a chunk set.

use crate::error::{IngestError, IngestResult};
use crate::progress::{report, Phase, ProgressFn};
use litrev_core::Chunk;
use litrev_db::{Database, EmbeddingSet};
use litrev_ollama::OllamaClient;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Computes embedding vectors for chunk text.
pub trait Embedder: Send + Sync {
    /// Model name recorded alongside the vectors.
    fn model(&self) -> &str;

    /// Embed `texts`, returning one vector per input in order.
    fn embed_texts(
        &self,
        texts: &[String],
    ) -> impl Future<Output = IngestResult<Vec<Vec<f32>>>> + Send;
}

impl Embedder for OllamaClient {
    fn model(&self) -> &str {
        OllamaClient::model(self)
    }

    async fn embed_texts(&self, texts: &[String]) -> IngestResult<Vec<Vec<f32>>> {
        Ok(self.embed_batch(texts).await?)
    }
}

/// Placeholder embedder type for publishers that store text only.
#[derive(Debug, Clone, Copy)]
pub enum NoEmbedder {}

impl Embedder for NoEmbedder {
    fn model(&self) -> &str {
        match *self {}
    }

    async fn embed_texts(&self, _texts: &[String]) -> IngestResult<Vec<Vec<f32>>> {
        match *self {}
    }
}

/// Outcome of a successful publish.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub index_path: PathBuf,
    pub chunks: usize,
    pub embedded: usize,
    pub model: Option<String>,
}

/// Replaces the index at a path with a freshly built one.
///
/// The existing index is deleted before the new one is written. If anything
/// fails after that point the partially written index is removed too and
/// [`IngestError::IndexRebuild`] reports the loss.
pub struct IndexPublisher<E = NoEmbedder> {
    index_path: PathBuf,
    embedder: Option<E>,
    batch_size: usize,
}

impl IndexPublisher<NoEmbedder> {
    /// Create a publisher that stores chunks without embeddings.
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            embedder: None,
            batch_size: 16,
        }
    }
}

impl<E: Embedder> IndexPublisher<E> {
    /// Compute embeddings with `embedder` while publishing.
    pub fn with_embedder<F: Embedder>(self, embedder: F) -> IndexPublisher<F> {
        IndexPublisher {
            index_path: self.index_path,
            embedder: Some(embedder),
            batch_size: self.batch_size,
        }
    }

    /// Number of chunks sent per embedding request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn embeds(&self) -> bool {
        self.embedder.is_some()
    }

    /// Files making up the index on disk: the database and its journals.
    fn index_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.index_path.clone()];
        for suffix in ["-wal", "-shm", "-journal"] {
            let mut name = self.index_path.clone().into_os_string();
            name.push(suffix);
            files.push(PathBuf::from(name));
        }
        files
    }

    fn remove_index_files(&self) -> std::io::Result<()> {
        for path in self.index_files() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Delete the existing index and build a new one from `chunks`.
    pub async fn publish(
        &self,
        chunks: &[Chunk],
        progress: Option<&ProgressFn<'_>>,
    ) -> IngestResult<PublishReport> {
        if let Err(e) = self.remove_index_files() {
            return Err(IngestError::IndexRebuild {
                path: self.index_path.clone(),
                message: format!("could not remove the existing index: {}", e),
                destructive: false,
            });
        }
        if let Some(parent) = self.index_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| IngestError::IndexRebuild {
                    path: self.index_path.clone(),
                    message: e.to_string(),
                    destructive: true,
                })?;
            }
        }

        match self.rebuild(chunks, progress).await {
            Ok(report) => {
                info!(
                    "Published {} chunks ({} embedded) to {:?}",
                    report.chunks, report.embedded, report.index_path
                );
                Ok(report)
            }
            Err(e) => {
                warn!("Index rebuild failed, removing partial index: {}", e);
                if let Err(cleanup) = self.remove_index_files() {
                    warn!("Could not remove partial index {:?}: {}", self.index_path, cleanup);
                }
                Err(IngestError::IndexRebuild {
                    path: self.index_path.clone(),
                    message: e.to_string(),
                    destructive: true,
                })
            }
        }
    }

    async fn embed_all(
        &self,
        embedder: &E,
        chunks: &[Chunk],
        progress: Option<&ProgressFn<'_>>,
    ) -> IngestResult<EmbeddingSet> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embedded = embedder.embed_texts(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(IngestError::IndexRebuild {
                    path: self.index_path.clone(),
                    message: format!(
                        "embedder returned {} vectors for {} chunks",
                        embedded.len(),
                        texts.len()
                    ),
                    destructive: true,
                });
            }
            vectors.extend(embedded);
            debug!("Embedded {}/{} chunks", vectors.len(), chunks.len());
            report(progress, Phase::Publish, None, true);
        }
        Ok(EmbeddingSet {
            model: embedder.model().to_string(),
            vectors,
        })
    }

    async fn rebuild(
        &self,
        chunks: &[Chunk],
        progress: Option<&ProgressFn<'_>>,
    ) -> IngestResult<PublishReport> {
        let embeddings = match &self.embedder {
            Some(embedder) => Some(self.embed_all(embedder, chunks, progress).await?),
            None => None,
        };

        let db = Database::open(&self.index_path)?;
        db.insert_chunks(chunks, embeddings.as_ref())?;
        let model = embeddings.as_ref().map(|set| set.model.clone());
        db.record_build(chunks.len(), model.as_deref())?;

        Ok(PublishReport {
            index_path: self.index_path.clone(),
            chunks: chunks.len(),
            embedded: embeddings.as_ref().map_or(0, |set| set.vectors.len()),
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use litrev_core::{keys, Metadata};
    use serde_json::json;
    use tempfile::tempdir;

    struct FixedEmbedder {
        fail: bool,
    }

    impl Embedder for FixedEmbedder {
        fn model(&self) -> &str {
            "fixed"
        }

        async fn embed_texts(&self, texts: &[String]) -> IngestResult<Vec<Vec<f32>>> {
            if self.fail {
                return Err(IngestError::Embedding(
                    litrev_ollama::OllamaError::ServerNotRunning {
                        host: "http://localhost:11434".to_string(),
                    },
                ));
            }
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0, 0.0])
                .collect())
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let mut metadata = Metadata::new();
                metadata.insert(keys::SOURCE.to_string(), json!("/docs/a.pdf"));
                metadata.insert(keys::CHUNK_ID.to_string(), json!(i));
                Chunk::new(i as u64, *text, metadata)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_publish_without_embeddings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index").join("index.db");
        let publisher = IndexPublisher::new(&path);

        let report = publisher.publish(&chunks(&["a", "b"]), None).await.unwrap();
        assert_eq!(report.chunks, 2);
        assert_eq!(report.embedded, 0);
        assert!(report.model.is_none());

        let db = Database::open(&path).unwrap();
        assert_eq!(db.chunk_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_publish_replaces_previous_index() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.db");
        let publisher = IndexPublisher::new(&path)
            .with_embedder(FixedEmbedder { fail: false })
            .with_batch_size(2);

        publisher
            .publish(&chunks(&["one", "two", "three"]), None)
            .await
            .unwrap();
        let report = publisher.publish(&chunks(&["only"]), None).await.unwrap();
        assert_eq!(report.embedded, 1);
        assert_eq!(report.model.as_deref(), Some("fixed"));

        let db = Database::open(&path).unwrap();
        assert_eq!(db.chunk_count().unwrap(), 1);
        assert_eq!(db.get_chunk(0).unwrap().content, "only");
        assert_eq!(db.get_embedding(0).unwrap().unwrap(), vec![4.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_failed_rebuild_is_destructive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.db");
        IndexPublisher::new(&path)
            .publish(&chunks(&["old"]), None)
            .await
            .unwrap();
        assert!(path.exists());

        let err = IndexPublisher::new(&path)
            .with_embedder(FixedEmbedder { fail: true })
            .publish(&chunks(&["new"]), None)
            .await
            .unwrap_err();

        assert!(err.is_destructive());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_embedding_batches_report_progress() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dir = tempdir().unwrap();
        let batches = AtomicUsize::new(0);
        let cb: &ProgressFn<'_> = &|e| {
            assert_eq!(e.phase, Phase::Publish);
            batches.fetch_add(1, Ordering::SeqCst);
        };

        IndexPublisher::new(dir.path().join("index.db"))
            .with_embedder(FixedEmbedder { fail: false })
            .with_batch_size(2)
            .publish(&chunks(&["a", "b", "c", "d", "e"]), Some(cb))
            .await
            .unwrap();
        assert_eq!(batches.load(Ordering::SeqCst), 3);
    }
}
