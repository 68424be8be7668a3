//! Index read/write operations.

pub mod chunks;
pub mod info;
pub mod stats;
pub mod vectors;
