//! Content fingerprints used as cache keys.

use crate::error::IngestResult;
use litrev_core::ContentFingerprint;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::Path;

/// SHA-256 over the full content of the file at `path`.
pub fn fingerprint(path: &Path) -> IngestResult<ContentFingerprint> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(ContentFingerprint::from_bytes(hasher.finalize().into()))
}

/// SHA-256 over an in-memory buffer.
pub fn fingerprint_bytes(bytes: &[u8]) -> ContentFingerprint {
    ContentFingerprint::from_bytes(Sha256::digest(bytes).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_identical_content_same_fingerprint() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("renamed copy.pdf");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
        assert_eq!(fingerprint(&a).unwrap(), fingerprint_bytes(b"same bytes"));
    }

    #[test]
    fn test_one_byte_difference_changes_fingerprint() {
        assert_ne!(fingerprint_bytes(b"abc"), fingerprint_bytes(b"abd"));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            fingerprint_bytes(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = fingerprint(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, crate::IngestError::Io(_)));
    }
}
