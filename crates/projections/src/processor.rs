//! Chain-sync processor fanning roll-forward and roll-backward out to
//! projectors.

use chain::{Block, ChainEvent};
use common::Slot;
use futures_util::future::try_join_all;

use crate::Result;
use crate::projector::Projector;

/// Delivers chain-sync instructions to every registered projector.
///
/// The processor supports:
/// - Roll-forward: applies a block to each projector that has not yet
///   committed it, so a block can be redelivered after a partial failure
/// - Roll-backward: reverts every projector to before a slot
///
/// Projectors are independent and are driven concurrently; each one still
/// sees at most one call at a time because the processor awaits every call
/// before accepting the next instruction.
#[derive(Default)]
pub struct ChainSyncProcessor {
    projectors: Vec<Box<dyn Projector>>,
}

impl ChainSyncProcessor {
    /// Creates a processor with no projectors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a projector with this processor.
    pub fn register(&mut self, projector: Box<dyn Projector>) {
        self.projectors.push(projector);
    }

    /// Returns the number of registered projectors.
    pub fn projector_count(&self) -> usize {
        self.projectors.len()
    }

    /// Dispatches a single chain-sync instruction.
    pub async fn handle(&self, event: &ChainEvent) -> Result<()> {
        match event {
            ChainEvent::RollForward(block) => self.roll_forward(block).await,
            ChainEvent::RollBackward { slot } => self.roll_backward(*slot).await,
        }
    }

    /// Applies `block` to every projector positioned before its slot.
    #[tracing::instrument(skip(self, block), fields(slot = %block.slot))]
    pub async fn roll_forward(&self, block: &Block) -> Result<()> {
        try_join_all(self.projectors.iter().map(|projector| async move {
            if let Some(position) = projector.position().await?
                && position.slot >= block.slot
            {
                tracing::debug!(
                    projection = projector.name(),
                    position = %position.slot,
                    "block already applied"
                );
                return Ok(());
            }
            projector.apply_block(block).await
        }))
        .await?;

        tracing::info!(
            transactions = block.transactions.len(),
            "rolled forward"
        );
        Ok(())
    }

    /// Reverts every projector to before `slot`.
    #[tracing::instrument(skip(self))]
    pub async fn roll_backward(&self, slot: Slot) -> Result<()> {
        try_join_all(
            self.projectors
                .iter()
                .map(|projector| projector.revert_after(slot)),
        )
        .await?;

        tracing::info!("rolled backward");
        Ok(())
    }

    /// Returns each projector's name with the slot it last committed.
    pub async fn positions(&self) -> Result<Vec<(&'static str, Option<Slot>)>> {
        let mut positions = Vec::with_capacity(self.projectors.len());
        for projector in &self.projectors {
            let slot = projector.position().await?.map(|checkpoint| checkpoint.slot);
            positions.push((projector.name(), slot));
        }
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{BlockHash, TxHash};
    use projection_store::ProjectionCheckpoint;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// A projector that records which slots it was asked to apply.
    #[derive(Clone, Default)]
    struct RecordingProjector {
        applied: Arc<RwLock<Vec<Slot>>>,
        reverted: Arc<RwLock<Vec<Slot>>>,
    }

    #[async_trait]
    impl Projector for RecordingProjector {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn apply_block(&self, block: &Block) -> Result<()> {
            self.applied.write().await.push(block.slot);
            Ok(())
        }

        async fn revert_after(&self, slot: Slot) -> Result<()> {
            self.reverted.write().await.push(slot);
            self.applied.write().await.retain(|s| *s < slot);
            Ok(())
        }

        async fn position(&self) -> Result<Option<ProjectionCheckpoint>> {
            Ok(self
                .applied
                .read()
                .await
                .last()
                .map(|slot| ProjectionCheckpoint::new("recording", *slot, BlockHash::new([0; 32]))))
        }
    }

    fn block(slot: u64) -> Block {
        Block::new(slot, BlockHash::new([slot as u8; 32]))
            .with_transaction(chain::Transaction::new(TxHash::new([slot as u8; 32])))
    }

    #[tokio::test]
    async fn roll_forward_reaches_every_projector() {
        let first = RecordingProjector::default();
        let second = RecordingProjector::default();
        let mut processor = ChainSyncProcessor::new();
        processor.register(Box::new(first.clone()));
        processor.register(Box::new(second.clone()));
        assert_eq!(processor.projector_count(), 2);

        processor.roll_forward(&block(10)).await.unwrap();

        assert_eq!(*first.applied.read().await, vec![Slot::new(10)]);
        assert_eq!(*second.applied.read().await, vec![Slot::new(10)]);
    }

    #[tokio::test]
    async fn redelivered_block_is_skipped() {
        let projector = RecordingProjector::default();
        let mut processor = ChainSyncProcessor::new();
        processor.register(Box::new(projector.clone()));

        processor.roll_forward(&block(10)).await.unwrap();
        processor.roll_forward(&block(10)).await.unwrap();
        processor.roll_forward(&block(5)).await.unwrap();

        assert_eq!(*projector.applied.read().await, vec![Slot::new(10)]);
    }

    #[tokio::test]
    async fn handle_dispatches_both_directions() {
        let projector = RecordingProjector::default();
        let mut processor = ChainSyncProcessor::new();
        processor.register(Box::new(projector.clone()));

        processor
            .handle(&ChainEvent::RollForward(block(10)))
            .await
            .unwrap();
        processor
            .handle(&ChainEvent::RollForward(block(20)))
            .await
            .unwrap();
        processor
            .handle(&ChainEvent::RollBackward {
                slot: Slot::new(15),
            })
            .await
            .unwrap();

        assert_eq!(*projector.reverted.read().await, vec![Slot::new(15)]);
        assert_eq!(
            processor.positions().await.unwrap(),
            vec![("recording", Some(Slot::new(10)))]
        );
    }

    #[tokio::test]
    async fn empty_processor_accepts_events() {
        let processor = ChainSyncProcessor::new();
        processor.roll_forward(&block(1)).await.unwrap();
        processor.roll_backward(Slot::new(1)).await.unwrap();
        assert!(processor.positions().await.unwrap().is_empty());
    }
}
