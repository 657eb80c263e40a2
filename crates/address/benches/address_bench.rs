use address::{Credential, ShelleyAddress, bech32_from_bytes, payment_key_hash};
use common::{Hash28, Network};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn base_address() -> Vec<u8> {
    ShelleyAddress::new(
        Credential::KeyHash(Hash28::new([0x42; 28])),
        Some(Credential::KeyHash(Hash28::new([0x24; 28]))),
    )
    .to_bytes(Network::Mainnet)
}

fn bench_encode(c: &mut Criterion) {
    let bytes = base_address();
    c.bench_function("address/bech32_from_bytes_base", |b| {
        b.iter(|| bech32_from_bytes(black_box(&bytes)).unwrap());
    });
}

fn bench_decode(c: &mut Criterion) {
    let encoded = bech32_from_bytes(&base_address()).unwrap().unwrap();
    c.bench_function("address/bech32_decode_base", |b| {
        b.iter(|| address::bech32::decode(black_box(&encoded)).unwrap());
    });
}

fn bench_key_hash(c: &mut Criterion) {
    let bytes = base_address();
    c.bench_function("address/payment_key_hash", |b| {
        b.iter(|| payment_key_hash(black_box(&bytes)));
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_key_hash);
criterion_main!(benches);
