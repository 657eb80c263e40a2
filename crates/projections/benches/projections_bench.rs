use address::{Credential, ShelleyAddress};
use chain::{Block, Transaction, TxInput, TxOutput};
use common::{BlockHash, Hash28, Network, Slot, TxHash};
use criterion::{Criterion, criterion_group, criterion_main};
use projection_store::InMemoryProjectionStore;
use projections::{Projector, UtxoProjector};

fn tx_hash(block: u64, tx: u64) -> TxHash {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&block.to_be_bytes());
    bytes[8..16].copy_from_slice(&tx.to_be_bytes());
    TxHash::new(bytes)
}

/// A chain of `blocks` blocks, each transaction spending one output of the
/// previous block and producing two new ones.
fn chain(blocks: u64, txs_per_block: u64) -> Vec<Block> {
    let address = ShelleyAddress::new(
        Credential::KeyHash(Hash28::new([0x11; 28])),
        Some(Credential::KeyHash(Hash28::new([0x22; 28]))),
    )
    .to_bytes(Network::Mainnet);

    (1..=blocks)
        .map(|slot| {
            let mut block = Block::new(slot, BlockHash::new([slot as u8; 32]));
            for tx in 0..txs_per_block {
                let mut transaction = Transaction::new(tx_hash(slot, tx))
                    .with_output(TxOutput::new(address.clone()))
                    .with_output(TxOutput::new(address.clone()));
                if slot > 1 {
                    transaction = transaction.with_input(TxInput::new(tx_hash(slot - 1, tx), 0));
                }
                block = block.with_transaction(transaction);
            }
            block
        })
        .collect()
}

fn bench_apply_blocks(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let blocks = chain(50, 20);

    c.bench_function("projections/utxo_apply_50_blocks", |b| {
        b.iter(|| {
            rt.block_on(async {
                let projector = UtxoProjector::new(InMemoryProjectionStore::new());
                for block in &blocks {
                    projector.apply_block(block).await.unwrap();
                }
            });
        });
    });
}

fn bench_rollback(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let blocks = chain(50, 20);

    c.bench_function("projections/utxo_revert_half", |b| {
        b.iter(|| {
            rt.block_on(async {
                let projector = UtxoProjector::new(InMemoryProjectionStore::new());
                for block in &blocks {
                    projector.apply_block(block).await.unwrap();
                }
                projector.revert_after(Slot::new(25)).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_apply_blocks, bench_rollback);
criterion_main!(benches);
