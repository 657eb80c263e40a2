//! Chain projections with rollback.
//!
//! This crate keeps materialized views in step with a forkable chain:
//! - [`Projector`] trait for views that apply blocks and revert to a slot
//! - [`UtxoProjector`]: the UTxO set
//! - [`OrderBookProjector`]: listings at the order-book script and how they closed
//! - [`ChainSyncProcessor`] for feeding chain-sync instructions to projectors

pub mod config;
pub mod error;
pub mod order_book;
pub mod processor;
pub mod projector;
pub mod redeemer_index;
pub mod utxo;

pub use config::ProjectionConfig;
pub use error::{ProjectionError, Result};
pub use order_book::OrderBookProjector;
pub use processor::ChainSyncProcessor;
pub use projector::Projector;
pub use redeemer_index::RedeemerIndex;
pub use utxo::UtxoProjector;
