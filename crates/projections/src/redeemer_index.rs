//! Per-block lookup from a consumed output to the transaction that consumed
//! it and the redeemer it supplied.

use std::collections::HashMap;

use chain::{Block, Transaction};
use common::OutputRef;

/// How an output was consumed within a block.
#[derive(Debug, Clone, Copy)]
pub struct Consumption<'a> {
    /// The consuming transaction.
    pub tx: &'a Transaction,
    /// Raw Spend redeemer for the input, if the transaction supplied one.
    pub redeemer: Option<&'a [u8]>,
}

/// Index of every input in a block. Built per block and never stored.
#[derive(Debug, Default)]
pub struct RedeemerIndex<'a> {
    entries: HashMap<OutputRef, Consumption<'a>>,
}

impl<'a> RedeemerIndex<'a> {
    /// Indexes every input of every transaction in `block`.
    pub fn build(block: &'a Block) -> Self {
        let entries = block
            .inputs()
            .map(|(tx, input)| {
                (
                    input.output_ref(),
                    Consumption {
                        tx,
                        redeemer: tx.spend_redeemer(input),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Looks up how `out_ref` was consumed.
    pub fn get(&self, out_ref: &OutputRef) -> Option<&Consumption<'a>> {
        self.entries.get(out_ref)
    }

    /// Every consumed output reference.
    pub fn consumed(&self) -> Vec<OutputRef> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain::{Redeemer, TxInput};
    use common::{BlockHash, TxHash};

    #[test]
    fn maps_inputs_to_consuming_tx_and_redeemer() {
        let listed = TxHash::new([1; 32]);
        let block = Block::new(105, BlockHash::new([0; 32]))
            .with_transaction(
                Transaction::new(TxHash::new([2; 32]))
                    .with_input(TxInput::new(listed, 0))
                    .with_redeemer(Redeemer::spend(0, vec![0xd8, 0x79, 0x80])),
            )
            .with_transaction(
                Transaction::new(TxHash::new([3; 32])).with_input(TxInput::new(listed, 1)),
            );

        let index = RedeemerIndex::build(&block);
        assert_eq!(index.len(), 2);

        let first = index.get(&OutputRef::new(listed, 0)).unwrap();
        assert_eq!(first.tx.hash, TxHash::new([2; 32]));
        assert_eq!(first.redeemer, Some(&[0xd8, 0x79, 0x80][..]));

        let second = index.get(&OutputRef::new(listed, 1)).unwrap();
        assert_eq!(second.tx.hash, TxHash::new([3; 32]));
        assert_eq!(second.redeemer, None);

        assert!(index.get(&OutputRef::new(listed, 2)).is_none());
    }

    #[test]
    fn empty_block_has_empty_index() {
        let block = Block::new(1, BlockHash::new([0; 32]));
        let index = RedeemerIndex::build(&block);
        assert!(index.is_empty());
        assert!(index.consumed().is_empty());
    }
}
