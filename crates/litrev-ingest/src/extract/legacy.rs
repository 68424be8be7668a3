//! Legacy `.doc` extraction.
//!
//! Prefers an installed converter (`antiword`, then `catdoc`); without one,
//! falls back to scanning the binary for runs of printable text.

use super::FormatExtractor;
use crate::error::{IngestError, IngestResult};
use litrev_core::FormatTag;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const CONVERTERS: [&str; 2] = ["antiword", "catdoc"];

/// Shortest run of printable characters kept by the fallback scan.
const MIN_RUN_CHARS: usize = 4;

/// Parser for legacy Word binary files.
#[derive(Debug, Default)]
pub struct LegacyDocExtractor {
    converter: Option<PathBuf>,
}

impl LegacyDocExtractor {
    /// Create an extractor using the first converter found on `PATH`.
    pub fn new() -> Self {
        let converter = CONVERTERS.iter().find_map(|name| which::which(name).ok());
        if let Some(path) = &converter {
            debug!("Using {:?} for .doc extraction", path);
        }
        Self { converter }
    }

    /// Create an extractor that only uses the built-in text scan.
    pub fn scan_only() -> Self {
        Self { converter: None }
    }

    fn convert(&self, converter: &Path, bytes: &[u8]) -> IngestResult<String> {
        let mut input = NamedTempFile::new()?;
        input.write_all(bytes)?;
        input.flush()?;

        let output = Command::new(converter).arg(input.path()).output()?;
        if !output.status.success() {
            return Err(IngestError::extraction(
                FormatTag::Doc,
                format!(
                    "{} exited with {}: {}",
                    converter.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl FormatExtractor for LegacyDocExtractor {
    fn format(&self) -> FormatTag {
        FormatTag::Doc
    }

    fn extract(&self, bytes: &[u8]) -> IngestResult<String> {
        if let Some(converter) = &self.converter {
            match self.convert(converter, bytes) {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => debug!("{:?} produced no text, scanning instead", converter),
                Err(e) => warn!("{}, scanning instead", e),
            }
        }
        Ok(scan_printable_text(bytes))
    }
}

fn is_printable(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => true,
        '\u{feff}' | '\u{e000}'..='\u{f8ff}' => false,
        _ => !c.is_control(),
    }
}

/// Collect runs of at least [`MIN_RUN_CHARS`] printable characters that carry
/// at least one letter, one run per line.
fn collect_runs(chars: impl Iterator<Item = char>) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut flush = |current: &mut String| {
        let text = current.replace('\r', "\n");
        let trimmed = text.trim();
        if trimmed.chars().count() >= MIN_RUN_CHARS && trimmed.chars().any(char::is_alphabetic) {
            runs.push(trimmed.to_string());
        }
        current.clear();
    };

    for c in chars {
        if is_printable(c) {
            current.push(c);
        } else {
            flush(&mut current);
        }
    }
    flush(&mut current);
    runs
}

fn letter_count(runs: &[String]) -> usize {
    runs.iter()
        .map(|r| r.chars().filter(|c| c.is_alphabetic()).count())
        .sum()
}

/// Best-effort text recovery from an opaque binary document.
///
/// Word stores body text either as UTF-16LE or as single-byte characters, so
/// both interpretations are scanned and the one yielding more letters wins.
pub fn scan_printable_text(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    let utf16 = collect_runs(char::decode_utf16(units).map(|r| r.unwrap_or('\u{0}')));
    let single = collect_runs(bytes.iter().map(|&b| match b {
        0x20..=0x7e | b'\t' | b'\n' | b'\r' => b as char,
        _ => '\u{0}',
    }));

    let runs = if letter_count(&utf16) >= letter_count(&single) {
        utf16
    } else {
        single
    };
    runs.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn test_scan_utf16_text() {
        let mut bytes = vec![0xd0, 0xcf, 0x11, 0xe0, 0xa1, 0xb1, 0x1a, 0xe1];
        bytes.extend(utf16le("Systematic review of soil carbon\r"));
        bytes.extend([0u8, 0, 0xff, 0xfe, 0, 0]);
        bytes.extend(utf16le("Second paragraph"));

        let text = scan_printable_text(&bytes);
        assert!(text.contains("Systematic review of soil carbon"));
        assert!(text.contains("Second paragraph"));
    }

    #[test]
    fn test_scan_single_byte_text() {
        let mut bytes = vec![0x00, 0xff, 0x01];
        bytes.extend(b"Quarterly findings summary");
        bytes.extend([0x00, 0x02, b'a', b'b', 0x00]);

        let text = scan_printable_text(&bytes);
        assert_eq!(text, "Quarterly findings summary");
    }

    #[test]
    fn test_scan_plain_utf8_passthrough() {
        assert_eq!(scan_printable_text(b"just text"), "just text");
    }

    #[test]
    fn test_scan_only_extractor() {
        let mut bytes = vec![0xd0, 0xcf, 0x11, 0xe0];
        bytes.extend(utf16le("Recovered words"));
        let text = LegacyDocExtractor::scan_only().extract(&bytes).unwrap();
        assert_eq!(text, "Recovered words");
    }
}
