//! Core projector trait.

use async_trait::async_trait;
use chain::Block;
use common::Slot;
use projection_store::ProjectionCheckpoint;

use crate::Result;

/// A materialized view over the chain that can move forward by one block
/// and back to any earlier slot.
///
/// Each call opens exactly one unit of work and commits it once, so a
/// failure leaves the view exactly as it was before the call. Callers must
/// not run two calls on the same projector concurrently.
#[async_trait]
pub trait Projector: Send + Sync {
    /// Returns the name of this projector, used for checkpoints and metrics.
    fn name(&self) -> &'static str;

    /// Applies every change `block` makes to this view.
    async fn apply_block(&self, block: &Block) -> Result<()>;

    /// Undoes every change made by blocks at or after `slot`.
    async fn revert_after(&self, slot: Slot) -> Result<()>;

    /// Returns the last block this projector committed, if any.
    async fn position(&self) -> Result<Option<ProjectionCheckpoint>>;
}
