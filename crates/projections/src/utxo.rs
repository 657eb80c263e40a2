//! UTxO-set projection: every output with a resolvable address, and the
//! slot it was spent at.

use async_trait::async_trait;
use chain::Block;
use common::{OutputRef, Slot};
use projection_store::{
    ProjectionCheckpoint, ProjectionStore, RecordKey, UtxoRecord, UtxoStatus,
};

use crate::Result;
use crate::projector::Projector;

/// Projects the chain's outputs into [`UtxoRecord`]s.
#[derive(Clone)]
pub struct UtxoProjector<S: ProjectionStore> {
    store: S,
}

impl<S: ProjectionStore> UtxoProjector<S> {
    /// Checkpoint and metrics name.
    pub const NAME: &'static str = "utxo";

    /// Creates a projector writing to `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Records for every output of `block` whose address resolves.
    fn created_records(block: &Block) -> Vec<UtxoRecord> {
        let mut created = Vec::new();
        for tx in &block.transactions {
            for (index, output) in (0u32..).zip(&tx.outputs) {
                let Some(owner) = address::resolve(&output.address) else {
                    tracing::debug!(tx = %tx.hash, index, "skipping output with unresolved address");
                    continue;
                };
                created.push(UtxoRecord::new(
                    RecordKey::new(block.slot, tx.hash, index),
                    owner,
                    output.raw.clone(),
                    output.datum.clone(),
                    output.amount.clone(),
                ));
            }
        }
        created
    }
}

#[async_trait]
impl<S: ProjectionStore> Projector for UtxoProjector<S> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[tracing::instrument(skip(self, block), fields(slot = %block.slot, block = %block.hash))]
    async fn apply_block(&self, block: &Block) -> Result<()> {
        let mut uow = self.store.begin().await?;

        let created = Self::created_records(block);
        uow.put_utxos(&created).await?;

        // Looked up after the inserts so an output created and spent in the
        // same block is found.
        let consumed: Vec<OutputRef> = block.inputs().map(|(_, input)| input.output_ref()).collect();
        let mut spent: Vec<UtxoRecord> = uow
            .find_utxos(&consumed)
            .await?
            .into_iter()
            .filter(|record| record.status() == UtxoStatus::Unspent)
            .collect();
        for record in &mut spent {
            record.mark_spent(block.slot);
        }
        uow.put_utxos(&spent).await?;

        uow.put_checkpoint(&ProjectionCheckpoint::new(Self::NAME, block.slot, block.hash))
            .await?;
        uow.commit().await?;

        metrics::counter!("projections_blocks_applied", "projection" => Self::NAME).increment(1);
        metrics::counter!("projections_records_created", "projection" => Self::NAME)
            .increment(created.len() as u64);
        metrics::counter!("projections_records_spent", "projection" => Self::NAME)
            .increment(spent.len() as u64);
        tracing::debug!(created = created.len(), spent = spent.len(), "block applied");

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn revert_after(&self, slot: Slot) -> Result<()> {
        let mut uow = self.store.begin().await?;

        // Deleting first means a record both created and spent at or after
        // `slot` is gone before the unspend pass looks for survivors.
        let removed = uow.delete_utxos_since(slot).await?;
        let mut restored = uow.utxos_spent_since(slot).await?;
        for record in &mut restored {
            record.mark_unspent();
        }
        uow.put_utxos(&restored).await?;
        uow.delete_checkpoints_since(Self::NAME, slot).await?;
        uow.commit().await?;

        metrics::counter!("projections_rollbacks", "projection" => Self::NAME).increment(1);
        metrics::counter!("projections_records_removed", "projection" => Self::NAME)
            .increment(removed);
        tracing::info!(removed, restored = restored.len(), "utxo projection rolled back");

        Ok(())
    }

    async fn position(&self) -> Result<Option<ProjectionCheckpoint>> {
        Ok(self.store.latest_checkpoint(Self::NAME).await?)
    }
}
