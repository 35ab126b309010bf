//! Error types for stylefold operations.

use thiserror::Error;

/// Errors that abort processing of a single document or a driver step.
///
/// Recoverable problems (a stylesheet that fails to load, a selector that
/// cannot be matched) are not errors; they are recorded as
/// [`Diagnostic`](crate::Diagnostic)s and processing continues.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "cli")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed document: {0}")]
    StructuralInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
