use async_trait::async_trait;
use common::{OutputRef, Slot};

use crate::{OrderRecord, ProjectionCheckpoint, Result, UtxoRecord};

/// Storage backing the projections.
///
/// All writes go through a [`UnitOfWork`]; the read methods here see only
/// committed state. Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ProjectionStore: Send + Sync {
    /// Opens a unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    /// Returns the newest committed checkpoint of `projection`.
    async fn latest_checkpoint(&self, projection: &str) -> Result<Option<ProjectionCheckpoint>>;

    /// Returns every committed UTxO record, ordered by key.
    async fn list_utxos(&self) -> Result<Vec<UtxoRecord>>;

    /// Returns every committed order record, ordered by key.
    async fn list_orders(&self) -> Result<Vec<OrderRecord>>;
}

/// An atomic batch of reads and writes.
///
/// Reads see the batch's own writes. Nothing becomes visible to other
/// readers until [`commit`](UnitOfWork::commit) succeeds; dropping the unit
/// of work without committing discards it.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Inserts records, or replaces the ones whose key already exists.
    async fn put_utxos(&mut self, records: &[UtxoRecord]) -> Result<()>;

    /// Finds records produced at any of `refs`, whatever their creation slot.
    async fn find_utxos(&mut self, refs: &[OutputRef]) -> Result<Vec<UtxoRecord>>;

    /// Returns records whose spent slot is at or after `slot`.
    async fn utxos_spent_since(&mut self, slot: Slot) -> Result<Vec<UtxoRecord>>;

    /// Deletes records created at or after `slot`, returning how many.
    async fn delete_utxos_since(&mut self, slot: Slot) -> Result<u64>;

    async fn put_orders(&mut self, records: &[OrderRecord]) -> Result<()>;

    async fn find_orders(&mut self, refs: &[OutputRef]) -> Result<Vec<OrderRecord>>;

    async fn orders_spent_since(&mut self, slot: Slot) -> Result<Vec<OrderRecord>>;

    async fn delete_orders_since(&mut self, slot: Slot) -> Result<u64>;

    /// Records that a projection has applied a block.
    async fn put_checkpoint(&mut self, checkpoint: &ProjectionCheckpoint) -> Result<()>;

    /// Deletes a projection's checkpoints at or after `slot`.
    async fn delete_checkpoints_since(&mut self, projection: &str, slot: Slot) -> Result<u64>;

    /// Makes every write visible at once.
    async fn commit(self: Box<Self>) -> Result<()>;
}
