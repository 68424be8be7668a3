//! Embedding server errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("No Ollama server reachable at {host}. Start one with 'ollama serve'.")]
    ServerNotRunning { host: String },

    #[error("Embedding request gave up after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Embedding model '{model}' is not installed. Run 'ollama pull {model}'.")]
    ModelNotFound { model: String },

    #[error("Ollama rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The server answered but produced a zero-length vector.
    #[error("Model '{model}' returned an empty embedding")]
    EmptyEmbedding { model: String },

    #[error("Transport failure: {0}")]
    Http(#[from] reqwest::Error),
}

pub type OllamaResult<T> = Result<T, OllamaError>;
