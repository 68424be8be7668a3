//! Litrev Ollama - Ollama integration for chunk and query embeddings.
//!
//! The index publisher uses this client to embed chunks before they are
//! written; query-time search uses it to embed the question.

mod client;
mod error;
mod types;

pub use client::OllamaClient;
pub use error::{OllamaError, OllamaResult};
pub use types::ModelInfo;
