//! Ranked retrieval over the index.

use super::chunks::{bytes_to_vector, row_to_chunk, CHUNK_COLUMNS};
use crate::database::Database;
use crate::error::DbResult;
use litrev_core::Chunk;
use rusqlite::params;

/// A chunk returned from a query, with its relevance score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// Cosine similarity for vector search, normalized BM25 for keyword search.
    pub score: f32,
}

/// Cosine of the angle between two vectors; 0.0 when they cannot be compared.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });
    let magnitude = (norm_a * norm_b).sqrt();
    if magnitude == 0.0 {
        0.0
    } else {
        dot / magnitude
    }
}

/// Turn free text into an FTS5 query that cannot trip the MATCH syntax.
fn fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

impl Database {
    /// Rank embedded chunks by cosine similarity to `query_vector`.
    ///
    /// Scans every stored vector; hits below `min_similarity` are dropped.
    pub fn vector_search(
        &self,
        query_vector: &[f32],
        limit: usize,
        min_similarity: Option<f32>,
    ) -> DbResult<Vec<SearchHit>> {
        let floor = min_similarity.unwrap_or(0.0);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, e.vector, e.dimensions
             FROM embeddings e JOIN chunks c ON c.chunk_id = e.chunk_id",
            CHUNK_COLUMNS
        ))?;

        let mut hits = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let bytes: Vec<u8> = row.get(3)?;
            let dimensions: i64 = row.get(4)?;
            let vector = bytes_to_vector(&bytes, dimensions as usize);
            let score = cosine_similarity(query_vector, &vector);
            if score >= floor {
                hits.push(SearchHit {
                    chunk: row_to_chunk(row)?,
                    score,
                });
            }
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    /// Full-text search over chunk content, best matches first.
    pub fn keyword_search(&self, query: &str, limit: usize) -> DbResult<Vec<SearchHit>> {
        let Some(match_expr) = fts_query(query) else {
            return Ok(Vec::new());
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}, bm25(chunks_fts)
            FROM chunks_fts
            JOIN chunks c ON c.chunk_id = chunks_fts.rowid
            WHERE chunks_fts MATCH ?1
            ORDER BY bm25(chunks_fts)
            LIMIT ?2
            "#,
            CHUNK_COLUMNS
        ))?;

        let hits = stmt
            .query_map(params![match_expr, limit as i64], |row| {
                let chunk = row_to_chunk(row)?;
                let bm25: f64 = row.get(3)?;
                // bm25() is negative and lower is better; squash into (0, 1)
                let score = 1.0 / (1.0 + (bm25 as f32).exp());
                Ok(SearchHit { chunk, score })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(hits)
    }

    /// Get embedding statistics: (embedded_count, total_count).
    pub fn embedding_stats(&self) -> DbResult<(i64, i64)> {
        let conn = self.conn()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        let embedded: i64 =
            conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok((embedded, total))
    }
}
