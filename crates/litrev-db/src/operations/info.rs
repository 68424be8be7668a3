//! Build information stored alongside the chunks.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use rusqlite::params;

pub const BUILT_AT: &str = "built_at";
pub const CHUNK_COUNT: &str = "chunk_count";
pub const EMBEDDING_MODEL: &str = "embedding_model";

impl Database {
    /// Set a build information value.
    pub fn set_info(&self, key: &str, value: &str) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO index_info (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Get a build information value.
    pub fn get_info(&self, key: &str) -> DbResult<Option<String>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT value FROM index_info WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// Record when and how the index was built.
    pub fn record_build(&self, chunk_count: usize, embedding_model: Option<&str>) -> DbResult<()> {
        self.set_info(BUILT_AT, &chrono::Utc::now().to_rfc3339())?;
        self.set_info(CHUNK_COUNT, &chunk_count.to_string())?;
        if let Some(model) = embedding_model {
            self.set_info(EMBEDDING_MODEL, model)?;
        }
        Ok(())
    }
}
