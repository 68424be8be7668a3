//! Errors raised while constructing core domain values.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed content fingerprint {input:?}: {reason}")]
    BadFingerprint { input: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
