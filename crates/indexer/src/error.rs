//! Indexer error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use projection_store::StoreError;
use projections::ProjectionError;
use thiserror::Error;

/// Errors that stop the indexer or fail a request.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// A projector failed to apply or revert.
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// The projection store could not be opened or migrated.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A feed line is not a valid chain event.
    #[error("feed line {line}: {source}")]
    Parse {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    /// Reading the feed failed.
    #[error("feed read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for indexer operations.
pub type Result<T> = std::result::Result<T, IndexerError>;

impl IntoResponse for IndexerError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "internal server error");
        let body = serde_json::json!({ "error": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}
