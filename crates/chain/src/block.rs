//! Block model delivered by chain sync.
//!
//! Byte fields travel as lowercase hex in JSON so a feed file can be written
//! by hand or captured from a node client.

use common::{BlockHash, OutputRef, Slot, TxHash, hex_bytes};
use serde::{Deserialize, Serialize};

/// A block at a slot, with its transactions in ledger order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub slot: Slot,
    pub hash: BlockHash,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Creates an empty block.
    pub fn new(slot: impl Into<Slot>, hash: BlockHash) -> Self {
        Self {
            slot: slot.into(),
            hash,
            transactions: Vec::new(),
        }
    }

    /// Appends a transaction.
    pub fn with_transaction(mut self, tx: Transaction) -> Self {
        self.transactions.push(tx);
        self
    }

    /// Every input of every transaction, in block order.
    pub fn inputs(&self) -> impl Iterator<Item = (&Transaction, &TxInput)> {
        self.transactions
            .iter()
            .flat_map(|tx| tx.inputs.iter().map(move |input| (tx, input)))
    }
}

/// A transaction as seen by projectors: what it consumes, what it produces,
/// and the redeemers it supplies to scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: TxHash,
    #[serde(default)]
    pub inputs: Vec<TxInput>,
    #[serde(default)]
    pub outputs: Vec<TxOutput>,
    #[serde(default)]
    pub redeemers: Vec<Redeemer>,
}

impl Transaction {
    pub fn new(hash: TxHash) -> Self {
        Self {
            hash,
            inputs: Vec::new(),
            outputs: Vec::new(),
            redeemers: Vec::new(),
        }
    }

    pub fn with_input(mut self, input: TxInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_output(mut self, output: TxOutput) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn with_redeemer(mut self, redeemer: Redeemer) -> Self {
        self.redeemers.push(redeemer);
        self
    }

    /// Reference to this transaction's output at `index`.
    pub fn output_ref(&self, index: u32) -> OutputRef {
        OutputRef::new(self.hash, index)
    }

    /// Raw redeemer bytes this transaction supplies for spending `input`.
    ///
    /// A redeemer carried on the input itself wins. Otherwise the Spend
    /// redeemer is looked up by the input's position among the transaction's
    /// inputs ordered by (tx hash, output index), which is how the ledger
    /// numbers spend redeemers.
    pub fn spend_redeemer<'a>(&'a self, input: &'a TxInput) -> Option<&'a [u8]> {
        if let Some(inline) = &input.redeemer {
            return Some(inline);
        }

        let target = input.output_ref();
        let mut sorted: Vec<OutputRef> = self.inputs.iter().map(TxInput::output_ref).collect();
        sorted.sort();
        let position = sorted.iter().position(|r| *r == target)?;
        let position = u32::try_from(position).ok()?;

        self.redeemers
            .iter()
            .find(|r| r.tag == RedeemerTag::Spend && r.index == position)
            .map(|r| r.data.as_slice())
    }

    /// The last output, used as the buyer's address heuristic.
    pub fn last_output(&self) -> Option<&TxOutput> {
        self.outputs.last()
    }
}

/// A consumed output reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub tx_hash: TxHash,
    pub index: u32,
    /// Redeemer supplied for this input, when the feed attaches it directly.
    #[serde(with = "hex_bytes::option", default, skip_serializing_if = "Option::is_none")]
    pub redeemer: Option<Vec<u8>>,
}

impl TxInput {
    pub fn new(tx_hash: TxHash, index: u32) -> Self {
        Self {
            tx_hash,
            index,
            redeemer: None,
        }
    }

    pub fn with_redeemer(mut self, redeemer: Vec<u8>) -> Self {
        self.redeemer = Some(redeemer);
        self
    }

    pub fn output_ref(&self) -> OutputRef {
        OutputRef::new(self.tx_hash, self.index)
    }
}

impl From<OutputRef> for TxInput {
    fn from(out_ref: OutputRef) -> Self {
        Self::new(out_ref.tx_hash, out_ref.index)
    }
}

/// A produced output. Amount, datum and the whole output are kept as the
/// raw CBOR the node delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    #[serde(with = "hex_bytes")]
    pub address: Vec<u8>,
    #[serde(with = "hex_bytes", default)]
    pub amount: Vec<u8>,
    #[serde(with = "hex_bytes::option", default, skip_serializing_if = "Option::is_none")]
    pub datum: Option<Vec<u8>>,
    #[serde(with = "hex_bytes", default)]
    pub raw: Vec<u8>,
}

impl TxOutput {
    pub fn new(address: Vec<u8>) -> Self {
        Self {
            address,
            amount: Vec::new(),
            datum: None,
            raw: Vec::new(),
        }
    }

    pub fn with_amount(mut self, amount: Vec<u8>) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_datum(mut self, datum: Vec<u8>) -> Self {
        self.datum = Some(datum);
        self
    }

    pub fn with_raw(mut self, raw: Vec<u8>) -> Self {
        self.raw = raw;
        self
    }
}

/// What a redeemer is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedeemerTag {
    Spend,
    Mint,
    Cert,
    Reward,
}

/// A redeemer from the transaction witness set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redeemer {
    pub tag: RedeemerTag,
    pub index: u32,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl Redeemer {
    pub fn spend(index: u32, data: Vec<u8>) -> Self {
        Self {
            tag: RedeemerTag::Spend,
            index,
            data,
        }
    }
}

/// A chain-sync instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChainEvent {
    /// Apply a block on top of the current tip.
    RollForward(Block),

    /// Undo everything at or after `slot`.
    RollBackward { slot: Slot },
}

impl ChainEvent {
    /// The slot this event refers to.
    pub fn slot(&self) -> Slot {
        match self {
            ChainEvent::RollForward(block) => block.slot,
            ChainEvent::RollBackward { slot } => *slot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx_hash(byte: u8) -> TxHash {
        TxHash::new([byte; 32])
    }

    #[test]
    fn spend_redeemer_follows_sorted_input_order() {
        // Inputs listed out of order; the ledger numbers them sorted.
        let tx = Transaction::new(tx_hash(9))
            .with_input(TxInput::new(tx_hash(3), 0))
            .with_input(TxInput::new(tx_hash(1), 5))
            .with_input(TxInput::new(tx_hash(1), 2))
            .with_redeemer(Redeemer::spend(0, vec![0xa0]))
            .with_redeemer(Redeemer::spend(2, vec![0xa2]))
            .with_redeemer(Redeemer {
                tag: RedeemerTag::Mint,
                index: 1,
                data: vec![0xff],
            });

        assert_eq!(tx.spend_redeemer(&tx.inputs[2]), Some(&[0xa0][..]));
        assert_eq!(tx.spend_redeemer(&tx.inputs[0]), Some(&[0xa2][..]));
        // Position 1 only has a mint redeemer.
        assert_eq!(tx.spend_redeemer(&tx.inputs[1]), None);
    }

    #[test]
    fn inline_redeemer_wins() {
        let tx = Transaction::new(tx_hash(9))
            .with_input(TxInput::new(tx_hash(1), 0).with_redeemer(vec![0x01]))
            .with_redeemer(Redeemer::spend(0, vec![0x02]));
        assert_eq!(tx.spend_redeemer(&tx.inputs[0]), Some(&[0x01][..]));
    }

    #[test]
    fn inline_redeemer_on_detached_input() {
        let input = TxInput::new(tx_hash(4), 1).with_redeemer(vec![0xd8, 0x79, 0x80]);
        let tx = Transaction::new(tx_hash(9));
        assert_eq!(tx.spend_redeemer(&input), Some(&[0xd8, 0x79, 0x80][..]));
    }

    #[test]
    fn spend_redeemer_for_foreign_input_is_none() {
        let tx = Transaction::new(tx_hash(9)).with_redeemer(Redeemer::spend(0, vec![0x02]));
        assert_eq!(tx.spend_redeemer(&TxInput::new(tx_hash(1), 0)), None);
    }

    #[test]
    fn block_inputs_span_transactions() {
        let block = Block::new(10, BlockHash::new([0; 32]))
            .with_transaction(Transaction::new(tx_hash(1)).with_input(TxInput::new(tx_hash(7), 0)))
            .with_transaction(
                Transaction::new(tx_hash(2))
                    .with_input(TxInput::new(tx_hash(7), 1))
                    .with_input(TxInput::new(tx_hash(8), 0)),
            );

        let consumed: Vec<_> = block
            .inputs()
            .map(|(tx, input)| (tx.hash, input.output_ref()))
            .collect();
        assert_eq!(consumed.len(), 3);
        assert_eq!(consumed[0], (tx_hash(1), OutputRef::new(tx_hash(7), 0)));
        assert_eq!(consumed[2], (tx_hash(2), OutputRef::new(tx_hash(8), 0)));
    }

    #[test]
    fn chain_event_json_shape() {
        let json = format!(
            r#"{{"type":"roll_forward","slot":100,"hash":"{h}","transactions":[
                {{"hash":"{h}","inputs":[{{"tx_hash":"{h}","index":1,"redeemer":"d87980"}}],
                  "outputs":[{{"address":"7100","datum":"d87980"}}]}}]}}"#,
            h = "ab".repeat(32)
        );
        let event: ChainEvent = serde_json::from_str(&json).unwrap();
        let ChainEvent::RollForward(block) = &event else {
            panic!("expected roll forward");
        };
        assert_eq!(event.slot(), Slot::new(100));
        let tx = &block.transactions[0];
        assert_eq!(tx.inputs[0].redeemer, Some(vec![0xd8, 0x79, 0x80]));
        assert_eq!(tx.outputs[0].address, vec![0x71, 0x00]);
        assert!(tx.outputs[0].raw.is_empty());
        assert!(tx.redeemers.is_empty());

        let back: ChainEvent = serde_json::from_str(r#"{"type":"roll_backward","slot":42}"#).unwrap();
        assert_eq!(back, ChainEvent::RollBackward { slot: Slot::new(42) });
        let json = serde_json::to_value(&back).unwrap();
        assert_eq!(json["type"], "roll_backward");
    }
}
