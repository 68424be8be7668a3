//! Observational progress reporting.

use std::path::Path;

/// Pipeline phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Ingest,
    Enrich,
    Segment,
    Publish,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Ingest => "ingest",
            Phase::Enrich => "enrich",
            Phase::Segment => "segment",
            Phase::Publish => "publish",
        }
    }
}

/// One processed unit: a file, a document, or an embedding batch.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    pub phase: Phase,
    pub path: Option<&'a Path>,
    pub ok: bool,
}

/// Callback invoked once per processed unit.
pub type ProgressFn<'a> = dyn Fn(ProgressEvent<'_>) + Send + Sync + 'a;

pub(crate) fn report(
    progress: Option<&ProgressFn<'_>>,
    phase: Phase,
    path: Option<&Path>,
    ok: bool,
) {
    if let Some(cb) = progress {
        cb(ProgressEvent { phase, path, ok });
    }
}
