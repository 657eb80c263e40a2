//! Projection records and their state transitions.
//!
//! Records are keyed by the slot of the block that created them, so a
//! rollback can find everything a reverted block produced. Only the spend
//! fields ever change; the transition methods keep them consistent with the
//! status.

use common::{OutputRef, Slot, TxHash, hex_bytes};
use serde::{Deserialize, Serialize};

use crate::{Result, StoreError};

/// Identity of a projected output: creation slot, producing transaction and
/// output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub slot: Slot,
    pub tx_hash: TxHash,
    pub index: u32,
}

impl RecordKey {
    pub fn new(slot: impl Into<Slot>, tx_hash: TxHash, index: u32) -> Self {
        Self {
            slot: slot.into(),
            tx_hash,
            index,
        }
    }

    /// The chain-level reference, without the creation slot.
    pub fn output_ref(&self) -> OutputRef {
        OutputRef::new(self.tx_hash, self.index)
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.output_ref(), self.slot)
    }
}

/// Lifecycle of a projected output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UtxoStatus {
    Unspent,
    Spent,
}

impl UtxoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UtxoStatus::Unspent => "unspent",
            UtxoStatus::Spent => "spent",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "unspent" => Ok(UtxoStatus::Unspent),
            "spent" => Ok(UtxoStatus::Spent),
            other => Err(StoreError::CorruptRecord(format!(
                "unknown utxo status '{other}'"
            ))),
        }
    }
}

/// An output as tracked by the UTxO-set projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoRecord {
    key: RecordKey,
    owner: String,
    spent_slot: Option<Slot>,
    #[serde(with = "hex_bytes")]
    raw_output: Vec<u8>,
    #[serde(with = "hex_bytes::option")]
    datum: Option<Vec<u8>>,
    #[serde(with = "hex_bytes")]
    amount: Vec<u8>,
    status: UtxoStatus,
}

impl UtxoRecord {
    /// Creates a freshly produced, unspent output.
    pub fn new(
        key: RecordKey,
        owner: impl Into<String>,
        raw_output: Vec<u8>,
        datum: Option<Vec<u8>>,
        amount: Vec<u8>,
    ) -> Self {
        Self {
            key,
            owner: owner.into(),
            spent_slot: None,
            raw_output,
            datum,
            amount,
            status: UtxoStatus::Unspent,
        }
    }

    /// Rebuilds a record read back from storage, rejecting inconsistent rows.
    pub fn restore(
        key: RecordKey,
        owner: String,
        status: UtxoStatus,
        spent_slot: Option<Slot>,
        raw_output: Vec<u8>,
        datum: Option<Vec<u8>>,
        amount: Vec<u8>,
    ) -> Result<Self> {
        if (status == UtxoStatus::Spent) != spent_slot.is_some() {
            return Err(StoreError::CorruptRecord(format!(
                "utxo {key} is {} with spent slot {spent_slot:?}",
                status.as_str()
            )));
        }
        Ok(Self {
            key,
            owner,
            spent_slot,
            raw_output,
            datum,
            amount,
            status,
        })
    }

    /// Marks the output consumed by a block at `slot`.
    pub fn mark_spent(&mut self, slot: Slot) {
        self.status = UtxoStatus::Spent;
        self.spent_slot = Some(slot);
    }

    /// Undoes a spend.
    pub fn mark_unspent(&mut self) {
        self.status = UtxoStatus::Unspent;
        self.spent_slot = None;
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn output_ref(&self) -> OutputRef {
        self.key.output_ref()
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn status(&self) -> UtxoStatus {
        self.status
    }

    pub fn spent_slot(&self) -> Option<Slot> {
        self.spent_slot
    }

    pub fn raw_output(&self) -> &[u8] {
        &self.raw_output
    }

    pub fn datum(&self) -> Option<&[u8]> {
        self.datum.as_deref()
    }

    pub fn amount(&self) -> &[u8] {
        &self.amount
    }
}

/// Lifecycle of a listed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Active,
    Sold,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Active => "active",
            OrderStatus::Sold => "sold",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(OrderStatus::Active),
            "sold" => Ok(OrderStatus::Sold),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(StoreError::CorruptRecord(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

/// Asset and quantity an order lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerms {
    #[serde(with = "hex_bytes")]
    pub policy_id: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub asset_name: Vec<u8>,
    pub quantity: u64,
}

/// An order locked at the order-book script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    key: RecordKey,
    owner: String,
    terms: OrderTerms,
    spent_slot: Option<Slot>,
    buyer: Option<String>,
    spending_tx: Option<TxHash>,
    #[serde(with = "hex_bytes")]
    raw_output: Vec<u8>,
    #[serde(with = "hex_bytes::option")]
    datum: Option<Vec<u8>>,
    status: OrderStatus,
}

impl OrderRecord {
    /// Creates a freshly listed, active order.
    pub fn new(
        key: RecordKey,
        owner: impl Into<String>,
        terms: OrderTerms,
        raw_output: Vec<u8>,
        datum: Option<Vec<u8>>,
    ) -> Self {
        Self {
            key,
            owner: owner.into(),
            terms,
            spent_slot: None,
            buyer: None,
            spending_tx: None,
            raw_output,
            datum,
            status: OrderStatus::Active,
        }
    }

    /// Rebuilds a record read back from storage, rejecting inconsistent rows.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        key: RecordKey,
        owner: String,
        terms: OrderTerms,
        status: OrderStatus,
        spent_slot: Option<Slot>,
        buyer: Option<String>,
        spending_tx: Option<TxHash>,
        raw_output: Vec<u8>,
        datum: Option<Vec<u8>>,
    ) -> Result<Self> {
        let consistent = match status {
            OrderStatus::Active => spent_slot.is_none() && buyer.is_none() && spending_tx.is_none(),
            OrderStatus::Sold => spent_slot.is_some() && buyer.is_some() && spending_tx.is_some(),
            OrderStatus::Cancelled => {
                spent_slot.is_some() && buyer.is_none() && spending_tx.is_none()
            }
        };
        if !consistent {
            return Err(StoreError::CorruptRecord(format!(
                "order {key} is {} with inconsistent spend fields",
                status.as_str()
            )));
        }
        Ok(Self {
            key,
            owner,
            terms,
            spent_slot,
            buyer,
            spending_tx,
            raw_output,
            datum,
            status,
        })
    }

    /// Marks the order bought at `slot` by `buyer` in transaction `spending_tx`.
    pub fn mark_sold(&mut self, slot: Slot, buyer: impl Into<String>, spending_tx: TxHash) {
        self.status = OrderStatus::Sold;
        self.spent_slot = Some(slot);
        self.buyer = Some(buyer.into());
        self.spending_tx = Some(spending_tx);
    }

    /// Marks the order withdrawn at `slot`.
    pub fn mark_cancelled(&mut self, slot: Slot) {
        self.status = OrderStatus::Cancelled;
        self.spent_slot = Some(slot);
        self.buyer = None;
        self.spending_tx = None;
    }

    /// Puts a sold or cancelled order back on the book.
    pub fn reactivate(&mut self) {
        self.status = OrderStatus::Active;
        self.spent_slot = None;
        self.buyer = None;
        self.spending_tx = None;
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn output_ref(&self) -> OutputRef {
        self.key.output_ref()
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn terms(&self) -> &OrderTerms {
        &self.terms
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn spent_slot(&self) -> Option<Slot> {
        self.spent_slot
    }

    pub fn buyer(&self) -> Option<&str> {
        self.buyer.as_deref()
    }

    pub fn spending_tx(&self) -> Option<TxHash> {
        self.spending_tx
    }

    pub fn raw_output(&self) -> &[u8] {
        &self.raw_output
    }

    pub fn datum(&self) -> Option<&[u8]> {
        self.datum.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> RecordKey {
        RecordKey::new(10, TxHash::new([7; 32]), 1)
    }

    fn terms() -> OrderTerms {
        OrderTerms {
            policy_id: vec![1],
            asset_name: vec![2],
            quantity: 5,
        }
    }

    #[test]
    fn utxo_spend_and_unspend() {
        let mut utxo = UtxoRecord::new(key(), "addr1x", vec![0x82], None, vec![0x01]);
        assert_eq!(utxo.status(), UtxoStatus::Unspent);
        assert_eq!(utxo.spent_slot(), None);

        utxo.mark_spent(Slot::new(20));
        assert_eq!(utxo.status(), UtxoStatus::Spent);
        assert_eq!(utxo.spent_slot(), Some(Slot::new(20)));

        utxo.mark_unspent();
        assert_eq!(utxo.status(), UtxoStatus::Unspent);
        assert_eq!(utxo.spent_slot(), None);
    }

    #[test]
    fn order_transitions_keep_fields_consistent() {
        let mut order = OrderRecord::new(key(), "addr1x", terms(), vec![], None);
        assert_eq!(order.status(), OrderStatus::Active);

        order.mark_sold(Slot::new(20), "addr1buyer", TxHash::new([9; 32]));
        assert_eq!(order.status(), OrderStatus::Sold);
        assert_eq!(order.buyer(), Some("addr1buyer"));
        assert_eq!(order.spending_tx(), Some(TxHash::new([9; 32])));

        order.mark_cancelled(Slot::new(21));
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.buyer(), None);
        assert_eq!(order.spending_tx(), None);
        assert_eq!(order.spent_slot(), Some(Slot::new(21)));

        order.reactivate();
        assert_eq!(order.status(), OrderStatus::Active);
        assert_eq!(order.spent_slot(), None);
    }

    #[test]
    fn restore_rejects_inconsistent_rows() {
        assert!(
            UtxoRecord::restore(
                key(),
                "a".into(),
                UtxoStatus::Spent,
                None,
                vec![],
                None,
                vec![]
            )
            .is_err()
        );
        assert!(
            OrderRecord::restore(
                key(),
                "a".into(),
                terms(),
                OrderStatus::Sold,
                Some(Slot::new(3)),
                None,
                None,
                vec![],
                None
            )
            .is_err()
        );
        assert!(
            OrderRecord::restore(
                key(),
                "a".into(),
                terms(),
                OrderStatus::Cancelled,
                Some(Slot::new(3)),
                None,
                None,
                vec![],
                None
            )
            .is_ok()
        );
    }

    #[test]
    fn status_text_forms() {
        for status in [OrderStatus::Active, OrderStatus::Sold, OrderStatus::Cancelled] {
            assert_eq!(OrderStatus::parse(status.as_str()).unwrap(), status);
        }
        assert_eq!(UtxoStatus::parse("spent").unwrap(), UtxoStatus::Spent);
        assert!(UtxoStatus::parse("gone").is_err());
    }

    #[test]
    fn keys_order_by_slot_first() {
        let early = RecordKey::new(5, TxHash::new([0xff; 32]), 9);
        let late = RecordKey::new(6, TxHash::new([0x00; 32]), 0);
        assert!(early < late);
    }
}
