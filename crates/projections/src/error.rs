//! Projection error types.

use thiserror::Error;

/// Errors that can occur while applying or reverting blocks.
///
/// Address and datum problems never surface here: an output that cannot be
/// interpreted is skipped, not reported.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The projection store failed; the unit of work was not committed.
    #[error("Projection store error: {0}")]
    Store(#[from] projection_store::StoreError),

    /// Projection configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
