//! Shared chain value types used across the projection crates.

pub mod types;

pub use types::{BlockHash, Hash28, Network, OutputRef, ParseHashError, Slot, TxHash, hex_bytes};
