//! Index statistics operations.

use super::info::{BUILT_AT, EMBEDDING_MODEL};
use crate::database::Database;
use crate::error::DbResult;
use litrev_core::IndexStats;
use std::collections::HashMap;

impl Database {
    /// Get summary statistics for the index.
    pub fn get_stats(&self) -> DbResult<IndexStats> {
        let (embedded_chunks, total_chunks) = self.embedding_stats()?;

        let conn = self.conn()?;

        let total_sources: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT source) FROM chunks",
            [],
            |row| row.get(0),
        )?;

        let mut chunks_by_type = HashMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT COALESCE(document_type, 'unknown'), COUNT(*) FROM chunks GROUP BY 1",
            )?;
            let rows = stmt.query_map([], |row| {
                let doc_type: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((doc_type, count))
            })?;
            for row in rows {
                let (doc_type, count) = row?;
                chunks_by_type.insert(doc_type, count);
            }
        }
        drop(conn);

        Ok(IndexStats {
            total_chunks,
            total_sources,
            embedded_chunks,
            chunks_by_type,
            built_at: self.get_info(BUILT_AT)?,
            embedding_model: self.get_info(EMBEDDING_MODEL)?,
        })
    }
}
