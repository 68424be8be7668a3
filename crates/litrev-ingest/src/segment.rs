//! Content chunking for retrieval.
//!
//! Recursive character splitting: text is cut at the coarsest separator that
//! occurs in it, small pieces are merged back into windows of at most
//! `chunk_size` characters that share up to `chunk_overlap` characters with
//! the previous window, and oversized pieces are split again with the next
//! finer separator.

use crate::progress::{report, Phase, ProgressFn};
use litrev_config::ChunkingConfig;
use litrev_core::{keys, Chunk, ChunkId, EnrichedDocument};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Separators tried in order, coarsest first. The empty separator splits
/// between characters.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

static PAGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"--- Page (\d+) ---").expect("valid page number regex"));

static PAGE_MARKER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"--- Page \d+ ---\n?").expect("valid page marker regex"));

/// Configuration for chunking, in characters.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum size of each chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::from(&ChunkingConfig::default())
    }
}

impl From<&ChunkingConfig> for ChunkConfig {
    fn from(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

/// A piece of text with its length in characters.
#[derive(Clone, Copy)]
struct Piece<'a> {
    text: &'a str,
    len: usize,
}

impl<'a> Piece<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            len: text.chars().count(),
        }
    }
}

/// Split `text` on `separator`, keeping each separator at the start of the
/// piece that follows it. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Character offsets of a text, for translating between byte and char positions.
struct CharIndex {
    byte_offsets: Vec<usize>,
    byte_len: usize,
}

impl CharIndex {
    fn new(text: &str) -> Self {
        Self {
            byte_offsets: text.char_indices().map(|(i, _)| i).collect(),
            byte_len: text.len(),
        }
    }

    fn byte_of(&self, char_pos: usize) -> usize {
        self.byte_offsets
            .get(char_pos)
            .copied()
            .unwrap_or(self.byte_len)
    }

    fn char_of(&self, byte_pos: usize) -> usize {
        self.byte_offsets
            .binary_search(&byte_pos)
            .unwrap_or_else(|insert_at| insert_at)
    }
}

/// Recursive character splitter.
#[derive(Debug, Clone)]
pub struct ChunkSegmenter {
    config: ChunkConfig,
    separators: Vec<String>,
}

impl ChunkSegmenter {
    /// Create a segmenter with the default separators.
    pub fn new(config: ChunkConfig) -> Self {
        Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Split text into trimmed, non-empty windows.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_recursive(text, &separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s));
        let (separator, remaining) = match position {
            Some(i) if separators[i].is_empty() => (separators[i], &separators[..0]),
            Some(i) => (separators[i], &separators[i + 1..]),
            None => (separators.last().copied().unwrap_or(""), &separators[..0]),
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<Piece<'_>> = Vec::new();

        for piece in split_keeping_separator(text, separator).into_iter().map(Piece::new) {
            if piece.len < self.config.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.text.to_string());
            } else {
                chunks.extend(self.split_recursive(piece.text, remaining));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }
        chunks
    }

    /// Greedily merge pieces into windows, carrying an overlap tail forward.
    fn merge(&self, pieces: &[Piece<'_>]) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut windows = Vec::new();
        let mut current: VecDeque<Piece<'_>> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            if total + piece.len > size && !current.is_empty() {
                if let Some(window) = join_window(&current) {
                    windows.push(window);
                }
                while total > overlap || (total + piece.len > size && total > 0) {
                    match current.pop_front() {
                        Some(front) => total -= front.len,
                        None => break,
                    }
                }
            }
            current.push_back(piece);
            total += piece.len;
        }
        if let Some(window) = join_window(&current) {
            windows.push(window);
        }
        windows
    }

    /// Chunk one text, numbering chunks from `first_id`.
    ///
    /// Each chunk carries a copy of `base` plus `chunk_id`, `start_index` and,
    /// when the chunk contains a page marker, `page`. Page markers are removed
    /// from chunk content; chunks left empty by that are dropped.
    pub fn segment_text(
        &self,
        text: &str,
        base: &serde_json::Map<String, Value>,
        first_id: ChunkId,
    ) -> Vec<Chunk> {
        let index = CharIndex::new(text);
        let overlap = self.config.chunk_overlap as i64;

        let mut chunks = Vec::new();
        let mut next_id = first_id;
        let mut previous_start: i64 = 0;
        let mut previous_len: i64 = 0;

        for window in self.split_text(text) {
            let from = (previous_start + previous_len - overlap).max(0) as usize;
            let from_byte = index.byte_of(from);
            let start = text[from_byte..]
                .find(&window)
                .map(|pos| index.char_of(from_byte + pos));
            previous_start = start.map(|s| s as i64).unwrap_or(-1);
            previous_len = window.chars().count() as i64;

            let page = PAGE_NUMBER
                .captures(&window)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok());
            let content = PAGE_MARKER_LINE.replace_all(&window, "");
            let content = content.trim();
            if content.is_empty() {
                continue;
            }

            let mut metadata = base.clone();
            metadata.insert(keys::CHUNK_ID.to_string(), json!(next_id));
            metadata.insert(
                keys::START_INDEX.to_string(),
                start.map_or(Value::Null, |s| json!(s)),
            );
            if let Some(page) = page {
                metadata.insert(keys::PAGE.to_string(), json!(page));
            }
            chunks.push(Chunk::new(next_id, content, metadata));
            next_id += 1;
        }
        chunks
    }

    /// Chunk a batch of documents with ids that are unique across the batch.
    pub fn segment(
        &self,
        documents: &[EnrichedDocument],
        progress: Option<&ProgressFn<'_>>,
    ) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for doc in documents {
            let next_id = chunks.len() as ChunkId;
            let doc_chunks = self.segment_text(&doc.text, &doc.metadata, next_id);
            debug!("Created {} chunks for {:?}", doc_chunks.len(), doc.source);
            chunks.extend(doc_chunks);
            report(progress, Phase::Segment, Some(&doc.source), true);
        }
        info!(
            "Segmented {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );
        chunks
    }
}

fn join_window(pieces: &VecDeque<Piece<'_>>) -> Option<String> {
    let joined: String = pieces.iter().map(|p| p.text).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
