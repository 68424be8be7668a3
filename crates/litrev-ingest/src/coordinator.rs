//! Parallel discovery, fingerprinting, caching and extraction of source files.

use crate::cache::TextCache;
use crate::error::{IngestError, IngestResult};
use crate::extract::{extractor_for, FormatExtractor};
use crate::hasher::fingerprint;
use crate::progress::{report, Phase, ProgressFn};
use litrev_core::{ContentFingerprint, FormatTag, SourceFile};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extracted text for one source file, before enrichment.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub source: SourceFile,
    pub fingerprint: ContentFingerprint,
    pub text: String,
    /// Whether the text came from the cache rather than a fresh extraction.
    pub from_cache: bool,
}

/// A file that produced no document.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of processing one file.
#[derive(Debug)]
pub enum FileOutcome {
    Loaded(RawDocument),
    Skipped(SkippedFile),
}

/// Result of ingesting a directory tree. Document order is unspecified.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents: Vec<RawDocument>,
    pub skipped: Vec<SkippedFile>,
    pub cache_hits: usize,
}

impl IngestReport {
    /// Number of files that produced a document.
    pub fn processed(&self) -> usize {
        self.documents.len()
    }
}

/// Per-file work shared by every worker.
#[derive(Clone)]
struct FileWorker {
    cache: Arc<TextCache>,
    extractors: Arc<HashMap<FormatTag, Arc<dyn FormatExtractor>>>,
}

impl FileWorker {
    fn skip(source: &SourceFile, reason: impl std::fmt::Display) -> FileOutcome {
        let reason = reason.to_string();
        warn!("Skipping {:?}: {}", source.path, reason);
        FileOutcome::Skipped(SkippedFile {
            path: source.path.clone(),
            reason,
        })
    }

    fn process(&self, source: &SourceFile) -> FileOutcome {
        let fingerprint = match fingerprint(&source.path) {
            Ok(fp) => fp,
            Err(e) => return Self::skip(source, e),
        };

        if let Some(text) = self.cache.lookup(&fingerprint) {
            return FileOutcome::Loaded(RawDocument {
                source: source.clone(),
                fingerprint,
                text,
                from_cache: true,
            });
        }

        let Some(extractor) = self.extractors.get(&source.format) else {
            return Self::skip(source, IngestError::UnsupportedFileType(source.format.to_string()));
        };
        let bytes = match std::fs::read(&source.path) {
            Ok(bytes) => bytes,
            Err(e) => return Self::skip(source, IngestError::Io(e)),
        };
        let text = match extractor.extract(&bytes) {
            Ok(text) => text,
            Err(e) => return Self::skip(source, e),
        };
        if text.trim().is_empty() {
            return Self::skip(source, "no text could be extracted");
        }

        if let Err(e) = self.cache.store(&fingerprint, &text) {
            warn!("Failed to cache text for {:?}: {}", source.path, e);
        }
        debug!("Extracted {} chars from {:?}", text.len(), source.path);

        FileOutcome::Loaded(RawDocument {
            source: source.clone(),
            fingerprint,
            text,
            from_cache: false,
        })
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Discovers supported files under a root and extracts their text in parallel.
pub struct IngestionCoordinator {
    worker: FileWorker,
    workers: usize,
    ignore_patterns: Vec<glob::Pattern>,
}

impl IngestionCoordinator {
    /// Create a coordinator with the default extractor for every format.
    pub fn new(cache: TextCache, workers: usize) -> Self {
        let extractors: HashMap<FormatTag, Arc<dyn FormatExtractor>> = FormatTag::ALL
            .into_iter()
            .map(|format| (format, Arc::from(extractor_for(format))))
            .collect();
        Self {
            worker: FileWorker {
                cache: Arc::new(cache),
                extractors: Arc::new(extractors),
            },
            workers: workers.max(1),
            ignore_patterns: Vec::new(),
        }
    }

    /// Skip files whose name matches any of the glob `patterns`.
    pub fn with_ignore_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> IngestResult<Self> {
        self.ignore_patterns = patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p.as_ref()).map_err(|e| IngestError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<IngestResult<_>>()?;
        Ok(self)
    }

    /// Replace the extractor used for one format.
    pub fn with_extractor(mut self, extractor: Arc<dyn FormatExtractor>) -> Self {
        let mut extractors = (*self.worker.extractors).clone();
        extractors.insert(extractor.format(), extractor);
        self.worker.extractors = Arc::new(extractors);
        self
    }

    pub fn cache(&self) -> &TextCache {
        &self.worker.cache
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.ignore_patterns.iter().any(|p| p.matches(name))
    }

    /// Recursively find supported files under `root`, sorted by path.
    pub fn discover(&self, root: &Path) -> IngestResult<Vec<SourceFile>> {
        if !root.is_dir() {
            return Err(IngestError::FileNotFound(root.to_path_buf()));
        }

        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error walking {:?}: {}", root, e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || self.is_ignored(entry.path()) {
                continue;
            }
            let Some(format) = FormatTag::from_path(entry.path()) else {
                continue;
            };
            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push(SourceFile::new(entry.path(), size_bytes, format));
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Discovered {} supported files under {:?}", files.len(), root);
        Ok(files)
    }

    /// Ingest every supported file under `root`.
    ///
    /// Files are processed on the blocking pool, at most `workers` at a time.
    /// Per-file failures become [`SkippedFile`]s; only an unusable root fails
    /// the whole call.
    pub async fn ingest(
        &self,
        root: &Path,
        progress: Option<&ProgressFn<'_>>,
    ) -> IngestResult<IngestReport> {
        let sources = self.discover(root)?;
        info!(
            "Ingesting {} files from {:?} with {} workers",
            sources.len(),
            root,
            self.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for source in sources {
            let semaphore = Arc::clone(&semaphore);
            let worker = self.worker.clone();
            tasks.spawn(async move {
                let path = source.path.clone();
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return FileOutcome::Skipped(SkippedFile {
                            path,
                            reason: e.to_string(),
                        })
                    }
                };
                match tokio::task::spawn_blocking(move || worker.process(&source)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Extraction task for {:?} failed: {}", path, e);
                        FileOutcome::Skipped(SkippedFile {
                            path,
                            reason: format!("extraction task failed: {}", e),
                        })
                    }
                }
            });
        }

        let mut result = IngestReport::default();
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|e| {
                FileOutcome::Skipped(SkippedFile {
                    path: PathBuf::new(),
                    reason: format!("ingestion task failed: {}", e),
                })
            });
            match outcome {
                FileOutcome::Loaded(doc) => {
                    report(progress, Phase::Ingest, Some(&doc.source.path), true);
                    if doc.from_cache {
                        result.cache_hits += 1;
                    }
                    result.documents.push(doc);
                }
                FileOutcome::Skipped(skipped) => {
                    report(progress, Phase::Ingest, Some(&skipped.path), false);
                    result.skipped.push(skipped);
                }
            }
        }

        info!(
            "Ingested {} documents ({} from cache), skipped {}",
            result.documents.len(),
            result.cache_hits,
            result.skipped.len()
        );
        Ok(result)
    }
}
