//! On-disk cache of extracted text, keyed by content fingerprint.

use crate::error::IngestResult;
use litrev_core::ContentFingerprint;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const ENTRY_EXTENSION: &str = "txt";

/// Extracted-text cache. One UTF-8 file per fingerprint, named `<hex>.txt`.
///
/// Writes go through a temporary file in the cache directory followed by a
/// rename, so concurrent stores of the same fingerprint never expose a
/// partially written entry.
#[derive(Debug, Clone)]
pub struct TextCache {
    dir: PathBuf,
}

/// Size summary of the cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}

impl TextCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> IngestResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the cached text for `fingerprint`.
    pub fn entry_path(&self, fingerprint: &ContentFingerprint) -> PathBuf {
        self.dir
            .join(format!("{}.{}", fingerprint.to_hex(), ENTRY_EXTENSION))
    }

    /// Cached text for `fingerprint`, if present.
    ///
    /// Unreadable entries are reported as misses so the caller re-extracts.
    pub fn lookup(&self, fingerprint: &ContentFingerprint) -> Option<String> {
        let path = self.entry_path(fingerprint);
        match fs::read_to_string(&path) {
            Ok(text) => {
                debug!("Cache hit: {}", fingerprint);
                Some(text)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {:?}: {}", path, e);
                None
            }
        }
    }

    /// Persist `text` under `fingerprint`, replacing any existing entry.
    pub fn store(&self, fingerprint: &ContentFingerprint, text: &str) -> IngestResult<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.flush()?;
        tmp.persist(self.entry_path(fingerprint))
            .map_err(|e| e.error)?;
        debug!("Cached {} chars under {}", text.len(), fingerprint);
        Ok(())
    }

    fn entries(&self) -> IngestResult<Vec<(PathBuf, u64)>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_entry = path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION)
                && path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s.parse::<ContentFingerprint>().is_ok());
            if is_entry {
                entries.push((path, entry.metadata()?.len()));
            }
        }
        Ok(entries)
    }

    /// Count and total size of cached entries.
    pub fn stats(&self) -> IngestResult<CacheStats> {
        let entries = self.entries()?;
        Ok(CacheStats {
            entries: entries.len(),
            total_bytes: entries.iter().map(|(_, size)| size).sum(),
        })
    }

    /// Remove every cached entry. Returns the number removed.
    pub fn clear(&self) -> IngestResult<usize> {
        let entries = self.entries()?;
        for (path, _) in &entries {
            fs::remove_file(path)?;
        }
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint_bytes;
    use tempfile::tempdir;

    #[test]
    fn test_store_then_lookup() {
        let dir = tempdir().unwrap();
        let cache = TextCache::open(dir.path().join("cache")).unwrap();
        let fp = fingerprint_bytes(b"pdf bytes");

        assert_eq!(cache.lookup(&fp), None);
        cache.store(&fp, "extracted text\n--- Page 1 ---\n").unwrap();
        assert_eq!(
            cache.lookup(&fp).as_deref(),
            Some("extracted text\n--- Page 1 ---\n")
        );
        assert!(cache.entry_path(&fp).ends_with(format!("{}.txt", fp.to_hex())));
    }

    #[test]
    fn test_store_overwrites() {
        let dir = tempdir().unwrap();
        let cache = TextCache::open(dir.path()).unwrap();
        let fp = fingerprint_bytes(b"x");

        cache.store(&fp, "old").unwrap();
        cache.store(&fp, "new").unwrap();
        assert_eq!(cache.lookup(&fp).as_deref(), Some("new"));
        assert_eq!(cache.stats().unwrap().entries, 1);
    }

    #[test]
    fn test_unicode_roundtrip() {
        let dir = tempdir().unwrap();
        let cache = TextCache::open(dir.path()).unwrap();
        let fp = fingerprint_bytes(b"u");

        cache.store(&fp, "Größe – naïve café 数据").unwrap();
        assert_eq!(cache.lookup(&fp).as_deref(), Some("Größe – naïve café 数据"));
    }

    #[test]
    fn test_stats_and_clear_ignore_foreign_files() {
        let dir = tempdir().unwrap();
        let cache = TextCache::open(dir.path()).unwrap();
        cache.store(&fingerprint_bytes(b"a"), "aaaa").unwrap();
        cache.store(&fingerprint_bytes(b"b"), "bb").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a cache entry").unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.total_bytes, 6);

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.stats().unwrap(), CacheStats::default());
        assert!(dir.path().join("notes.txt").exists());
    }
}
