use thiserror::Error;

/// Errors that can occur when reading or writing projection state.
///
/// None of these are recoverable by a projector; they abort the unit of work
/// and are handed back to the caller unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row does not describe a valid record.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

/// Result type for projection store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
