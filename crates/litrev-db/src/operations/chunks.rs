//! Chunk write and lookup operations.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use litrev_core::{keys, Chunk, ChunkId, Metadata};
use rusqlite::{params, Row};

/// Embeddings computed for a chunk batch, parallel to the chunk slice.
#[derive(Debug, Clone)]
pub struct EmbeddingSet {
    pub model: String,
    pub vectors: Vec<Vec<f32>>,
}

pub(crate) const CHUNK_COLUMNS: &str = "c.chunk_id, c.content, c.metadata";

/// Map a row selected with [`CHUNK_COLUMNS`] to a chunk.
pub(crate) fn row_to_chunk(row: &Row) -> rusqlite::Result<Chunk> {
    let chunk_id: i64 = row.get(0)?;
    let content: String = row.get(1)?;
    let metadata_json: String = row.get(2)?;
    let metadata: Metadata = serde_json::from_str(&metadata_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Chunk::new(chunk_id as ChunkId, content, metadata))
}

pub(crate) fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn bytes_to_vector(bytes: &[u8], dimensions: usize) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .take(dimensions)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

impl Database {
    /// Insert a full chunk set (and optional embeddings) in one transaction.
    pub fn insert_chunks(&self, chunks: &[Chunk], embeddings: Option<&EmbeddingSet>) -> DbResult<()> {
        if let Some(set) = embeddings {
            if set.vectors.len() != chunks.len() {
                return Err(DbError::EmbeddingCountMismatch {
                    chunks: chunks.len(),
                    vectors: set.vectors.len(),
                });
            }
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        {
            let mut chunk_stmt = tx.prepare(
                r#"
                INSERT INTO chunks (chunk_id, content, metadata, source, document_type, page, start_index)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            let mut embed_stmt = tx.prepare(
                r#"
                INSERT INTO embeddings (chunk_id, vector, model, dimensions)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;

            for (i, chunk) in chunks.iter().enumerate() {
                let metadata = serde_json::to_string(&chunk.metadata)?;
                let document_type = chunk
                    .metadata
                    .get(keys::DOCUMENT_TYPE)
                    .and_then(|v| v.as_str());
                chunk_stmt.execute(params![
                    chunk.chunk_id as i64,
                    chunk.content,
                    metadata,
                    chunk.source(),
                    document_type,
                    chunk.page(),
                    chunk.start_index().map(|s| s as i64),
                ])?;

                if let Some(set) = embeddings {
                    let vector = &set.vectors[i];
                    embed_stmt.execute(params![
                        chunk.chunk_id as i64,
                        vector_to_bytes(vector),
                        set.model,
                        vector.len() as i64,
                    ])?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Get a chunk by ID.
    pub fn get_chunk(&self, id: ChunkId) -> DbResult<Chunk> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM chunks c WHERE c.chunk_id = ?1", CHUNK_COLUMNS),
            params![id as i64],
            row_to_chunk,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::ChunkNotFound(id),
            _ => DbError::from(e),
        })
    }

    /// All chunks ordered by chunk id.
    pub fn all_chunks(&self) -> DbResult<Vec<Chunk>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chunks c ORDER BY c.chunk_id",
            CHUNK_COLUMNS
        ))?;
        let chunks = stmt.query_map([], row_to_chunk)?;
        chunks.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Number of chunks in the index.
    pub fn chunk_count(&self) -> DbResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Distinct source paths with their chunk counts.
    pub fn list_sources(&self) -> DbResult<Vec<(String, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source, COUNT(*) FROM chunks WHERE source IS NOT NULL
             GROUP BY source ORDER BY source",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Get the embedding stored for a chunk.
    pub fn get_embedding(&self, chunk_id: ChunkId) -> DbResult<Option<Vec<f32>>> {
        let conn = self.conn()?;

        let result = conn.query_row(
            "SELECT vector, dimensions FROM embeddings WHERE chunk_id = ?1",
            params![chunk_id as i64],
            |row| {
                let bytes: Vec<u8> = row.get(0)?;
                let dimensions: i64 = row.get(1)?;
                Ok((bytes, dimensions))
            },
        );

        match result {
            Ok((bytes, dimensions)) => Ok(Some(bytes_to_vector(&bytes, dimensions as usize))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_chunk(id: ChunkId, content: &str, source: &str, page: Option<u32>) -> Chunk {
        let mut metadata = Metadata::new();
        metadata.insert(keys::SOURCE.to_string(), json!(source));
        metadata.insert(keys::DOCUMENT_TYPE.to_string(), json!("research_paper"));
        metadata.insert(keys::CHUNK_ID.to_string(), json!(id));
        metadata.insert(keys::START_INDEX.to_string(), json!(0));
        if let Some(p) = page {
            metadata.insert(keys::PAGE.to_string(), json!(p));
        }
        Chunk::new(id, content, metadata)
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let chunks = vec![
            sample_chunk(0, "First chunk content", "/docs/a.pdf", Some(1)),
            sample_chunk(1, "Second chunk content", "/docs/a.pdf", Some(2)),
            sample_chunk(2, "Other document", "/docs/b.docx", None),
        ];

        db.insert_chunks(&chunks, None).unwrap();

        assert_eq!(db.chunk_count().unwrap(), 3);
        let fetched = db.get_chunk(1).unwrap();
        assert_eq!(fetched, chunks[1]);
        assert_eq!(fetched.page(), Some(2));

        let sources = db.list_sources().unwrap();
        assert_eq!(
            sources,
            vec![("/docs/a.pdf".to_string(), 2), ("/docs/b.docx".to_string(), 1)]
        );
    }

    #[test]
    fn test_get_missing_chunk() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_chunk(42), Err(DbError::ChunkNotFound(42))));
    }

    #[test]
    fn test_insert_with_embeddings() {
        let db = Database::open_in_memory().unwrap();
        let chunks = vec![sample_chunk(0, "Embedded", "/docs/a.pdf", None)];
        let set = EmbeddingSet {
            model: "test-model".to_string(),
            vectors: vec![vec![0.1, 0.2, 0.3, 0.4]],
        };

        db.insert_chunks(&chunks, Some(&set)).unwrap();

        let retrieved = db.get_embedding(0).unwrap().unwrap();
        assert_eq!(retrieved.len(), 4);
        assert!((retrieved[0] - 0.1).abs() < 0.0001);
    }

    #[test]
    fn test_embedding_count_mismatch_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let chunks = vec![
            sample_chunk(0, "one", "/docs/a.pdf", None),
            sample_chunk(1, "two", "/docs/a.pdf", None),
        ];
        let set = EmbeddingSet {
            model: "test-model".to_string(),
            vectors: vec![vec![1.0]],
        };

        assert!(matches!(
            db.insert_chunks(&chunks, Some(&set)),
            Err(DbError::EmbeddingCountMismatch {
                chunks: 2,
                vectors: 1
            })
        ));
        assert_eq!(db.chunk_count().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_ids_abort_whole_batch() {
        let db = Database::open_in_memory().unwrap();
        let chunks = vec![
            sample_chunk(0, "one", "/docs/a.pdf", None),
            sample_chunk(0, "dup", "/docs/a.pdf", None),
        ];

        assert!(db.insert_chunks(&chunks, None).is_err());
        assert_eq!(db.chunk_count().unwrap(), 0);
    }
}
