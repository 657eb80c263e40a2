//! Order-book projection: outputs locked at the order-book script with a
//! well-formed order datum, and whether they were bought or withdrawn.

use address::Credential;
use async_trait::async_trait;
use chain::{AcceptRedeemer, Block, OrderDatum, TxOutput, plutus};
use common::{Hash28, Slot};
use projection_store::{
    OrderRecord, OrderStatus, OrderTerms, ProjectionCheckpoint, ProjectionStore, RecordKey,
};

use crate::Result;
use crate::config::ProjectionConfig;
use crate::projector::Projector;
use crate::redeemer_index::{Consumption, RedeemerIndex};

/// Projects order-book script outputs into [`OrderRecord`]s.
#[derive(Clone)]
pub struct OrderBookProjector<S: ProjectionStore> {
    store: S,
    script_hash: Hash28,
}

/// What spending an order means.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Sold { buyer: String },
    Cancelled,
}

impl<S: ProjectionStore> OrderBookProjector<S> {
    /// Checkpoint and metrics name.
    pub const NAME: &'static str = "order_book";

    /// Creates a projector tracking the script configured in `config`.
    pub fn new(store: S, config: &ProjectionConfig) -> Self {
        Self {
            store,
            script_hash: config.order_book_script_hash,
        }
    }

    /// Interprets `output` as an order, or `None` if it is not one.
    fn order_from_output(&self, key: RecordKey, output: &TxOutput) -> Option<OrderRecord> {
        let owner = address::resolve(&output.address).filter(|a| a.starts_with("addr"))?;

        if address::payment_credential(&output.address)
            != Some(Credential::ScriptHash(self.script_hash))
        {
            return None;
        }

        let Some(raw_datum) = output.datum.as_deref() else {
            tracing::debug!(%key, "order-book output without datum");
            return None;
        };
        let datum: OrderDatum = match plutus::decode(raw_datum) {
            Ok(datum) => datum,
            Err(error) => {
                tracing::debug!(%key, %error, "order-book output with malformed datum");
                return None;
            }
        };

        Some(OrderRecord::new(
            key,
            owner,
            OrderTerms {
                policy_id: datum.asset.policy_id,
                asset_name: datum.asset.asset_name,
                quantity: datum.quantity,
            },
            output.raw.clone(),
            output.datum.clone(),
        ))
    }

    fn created_records(&self, block: &Block) -> Vec<OrderRecord> {
        block
            .transactions
            .iter()
            .flat_map(|tx| {
                (0u32..)
                    .zip(&tx.outputs)
                    .filter_map(move |(index, output)| {
                        self.order_from_output(RecordKey::new(block.slot, tx.hash, index), output)
                    })
            })
            .collect()
    }
}

/// Decides between a purchase and a withdrawal.
///
/// Only a redeemer that decodes as Accept is a purchase; the buyer is taken
/// to be the owner of the consuming transaction's last output, or the empty
/// string when that address does not resolve.
fn outcome(consumption: &Consumption<'_>) -> Outcome {
    let accepted = consumption
        .redeemer
        .is_some_and(|raw| plutus::decode::<AcceptRedeemer>(raw).is_ok());
    if !accepted {
        return Outcome::Cancelled;
    }

    let buyer = consumption
        .tx
        .last_output()
        .and_then(|output| address::resolve(&output.address))
        .unwrap_or_default();
    Outcome::Sold { buyer }
}

#[async_trait]
impl<S: ProjectionStore> Projector for OrderBookProjector<S> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[tracing::instrument(skip(self, block), fields(slot = %block.slot, block = %block.hash))]
    async fn apply_block(&self, block: &Block) -> Result<()> {
        let mut uow = self.store.begin().await?;

        let created = self.created_records(block);
        uow.put_orders(&created).await?;

        let index = RedeemerIndex::build(block);
        let mut spent = Vec::new();
        if !index.is_empty() {
            for mut order in uow.find_orders(&index.consumed()).await? {
                if order.status() != OrderStatus::Active {
                    continue;
                }
                let Some(consumption) = index.get(&order.output_ref()) else {
                    continue;
                };
                match outcome(consumption) {
                    Outcome::Sold { buyer } => {
                        order.mark_sold(block.slot, buyer, consumption.tx.hash)
                    }
                    Outcome::Cancelled => order.mark_cancelled(block.slot),
                }
                spent.push(order);
            }
        }
        uow.put_orders(&spent).await?;

        uow.put_checkpoint(&ProjectionCheckpoint::new(Self::NAME, block.slot, block.hash))
            .await?;
        uow.commit().await?;

        metrics::counter!("projections_blocks_applied", "projection" => Self::NAME).increment(1);
        metrics::counter!("projections_records_created", "projection" => Self::NAME)
            .increment(created.len() as u64);
        metrics::counter!("projections_records_spent", "projection" => Self::NAME)
            .increment(spent.len() as u64);
        if !created.is_empty() || !spent.is_empty() {
            tracing::info!(listed = created.len(), closed = spent.len(), "order book updated");
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn revert_after(&self, slot: Slot) -> Result<()> {
        let mut uow = self.store.begin().await?;

        let removed = uow.delete_orders_since(slot).await?;
        let mut reopened = uow.orders_spent_since(slot).await?;
        for order in &mut reopened {
            order.reactivate();
        }
        uow.put_orders(&reopened).await?;
        uow.delete_checkpoints_since(Self::NAME, slot).await?;
        uow.commit().await?;

        metrics::counter!("projections_rollbacks", "projection" => Self::NAME).increment(1);
        metrics::counter!("projections_records_removed", "projection" => Self::NAME)
            .increment(removed);
        tracing::info!(removed, reopened = reopened.len(), "order book rolled back");

        Ok(())
    }

    async fn position(&self) -> Result<Option<ProjectionCheckpoint>> {
        Ok(self.store.latest_checkpoint(Self::NAME).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use address::ShelleyAddress;
    use chain::{AssetClass, CancelRedeemer, Transaction, TxInput};
    use common::{Network, TxHash};

    fn consumption_with(tx: &Transaction, redeemer: Option<Vec<u8>>) -> Outcome {
        let redeemer = redeemer.as_deref();
        outcome(&Consumption { tx, redeemer })
    }

    fn buyer_address() -> Vec<u8> {
        ShelleyAddress::new(Credential::KeyHash(Hash28::new([0x33; 28])), None)
            .to_bytes(Network::Mainnet)
    }

    #[test]
    fn accept_is_a_sale_to_the_last_output() {
        let tx = Transaction::new(TxHash::new([2; 32]))
            .with_output(TxOutput::new(vec![0x82]))
            .with_output(TxOutput::new(buyer_address()));

        let Outcome::Sold { buyer } = consumption_with(&tx, Some(plutus::encode(&AcceptRedeemer)))
        else {
            panic!("expected a sale");
        };
        assert!(buyer.starts_with("addr1"));
    }

    #[test]
    fn sale_with_unresolvable_buyer_has_empty_buyer() {
        let tx = Transaction::new(TxHash::new([2; 32])).with_output(TxOutput::new(vec![0x82]));
        assert_eq!(
            consumption_with(&tx, Some(plutus::encode(&AcceptRedeemer))),
            Outcome::Sold {
                buyer: String::new()
            }
        );
    }

    #[test]
    fn anything_but_accept_is_a_cancellation() {
        let tx = Transaction::new(TxHash::new([2; 32])).with_output(TxOutput::new(buyer_address()));
        assert_eq!(
            consumption_with(&tx, Some(plutus::encode(&CancelRedeemer))),
            Outcome::Cancelled
        );
        assert_eq!(consumption_with(&tx, None), Outcome::Cancelled);
        assert_eq!(consumption_with(&tx, Some(vec![0xff])), Outcome::Cancelled);
        let datum = OrderDatum {
            owner: vec![1],
            asset: AssetClass {
                policy_id: vec![],
                asset_name: vec![],
            },
            quantity: 1,
        };
        assert_eq!(
            consumption_with(&tx, Some(plutus::encode(&datum))),
            Outcome::Cancelled
        );
    }

    #[test]
    fn spent_input_without_redeemer_in_block_is_cancelled() {
        let listed = TxHash::new([1; 32]);
        let block = Block::new(5, common::BlockHash::new([0; 32])).with_transaction(
            Transaction::new(TxHash::new([2; 32])).with_input(TxInput::new(listed, 0)),
        );
        let index = RedeemerIndex::build(&block);
        let consumption = index.get(&common::OutputRef::new(listed, 0)).unwrap();
        assert_eq!(outcome(consumption), Outcome::Cancelled);
    }
}
