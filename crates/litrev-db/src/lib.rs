//! Litrev DB - Persisted chunk index for Litrev using SQLite.

mod database;
mod error;
mod migrations;
mod operations;

pub use database::Database;
pub use error::{DbError, DbResult};
pub use operations::chunks::EmbeddingSet;
pub use operations::vectors::{cosine_similarity, SearchHit};
