use chrono::{DateTime, Utc};
use common::{BlockHash, Slot};
use serde::{Deserialize, Serialize};

/// The last block a projection committed.
///
/// One row is written per applied block, in the same unit of work as the
/// block's record changes; a rollback deletes the rows at or after the
/// rollback slot, so the newest remaining row is always the resume point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionCheckpoint {
    /// Name of the projection this checkpoint belongs to.
    pub projection: String,

    /// Slot of the applied block.
    pub slot: Slot,

    /// Hash of the applied block.
    pub block_hash: BlockHash,

    /// When the block was committed.
    pub applied_at: DateTime<Utc>,
}

impl ProjectionCheckpoint {
    /// Creates a checkpoint stamped with the current time.
    pub fn new(projection: impl Into<String>, slot: Slot, block_hash: BlockHash) -> Self {
        Self {
            projection: projection.into(),
            slot,
            block_hash,
            applied_at: Utc::now(),
        }
    }
}
