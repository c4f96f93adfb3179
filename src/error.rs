//! Error types for the classification and diff pipeline.
//!
//! Three kinds of failure exist: unresolvable shapes (fatal, abort the run),
//! external-call failures (propagated, no retry), and soft skips which are
//! not errors at all and never appear here.

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline error.
#[derive(Debug, Error)]
pub enum DeltaError {
    /// The classifier could not map a file to any known type, even after
    /// parent-directory fallback. Indicates a stale or incomplete catalog.
    #[error("unresolvable metadata shape at {path}: {detail}")]
    UnresolvableShape { path: PathBuf, detail: String },

    /// A boundary collaborator (catalog fetch, member list, retrieval)
    /// failed. The caller decides whether to re-run.
    #[error("external call failed: {0}")]
    ExternalCall(String),

    /// A metadata file did not parse as the expected XML dialect.
    #[error("malformed metadata XML in {path}: {detail}")]
    MalformedXml { path: PathBuf, detail: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DeltaError {
    /// Whether this error aborts the run unconditionally (catalog-staleness
    /// bug rather than an environmental failure).
    pub fn is_fatal_shape(&self) -> bool {
        matches!(self, DeltaError::UnresolvableShape { .. })
    }
}
