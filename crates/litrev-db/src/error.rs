//! Index error types.

use litrev_core::ChunkId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Index file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chunk {0} is not in the index")]
    ChunkNotFound(ChunkId),

    #[error("Got {vectors} embeddings for {chunks} chunks")]
    EmbeddingCountMismatch { chunks: usize, vectors: usize },

    #[error("Invalid chunk metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;
