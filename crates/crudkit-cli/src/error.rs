//! CLI error type.

use thiserror::Error;

/// Errors surfaced to the command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// Mapper or driver failure.
    #[error(transparent)]
    Mapper(#[from] crudkit_core::Error),

    /// Output serialization failure.
    #[error("cannot serialize output: {0}")]
    Json(#[from] serde_json::Error),

    /// The CRUD suite ran but some checks failed.
    #[error("{failed} of {total} checks failed")]
    SuiteFailed { failed: usize, total: usize },
}
