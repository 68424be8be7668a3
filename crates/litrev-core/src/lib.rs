//! Litrev Core - Core types and domain models for the literature-review index.

mod error;
mod types;

pub use error::{Error, Result};
pub use types::*;
