//! Chain-side inputs to the projections.
//!
//! - [`block`]: the block model chain sync delivers, and the roll-forward /
//!   roll-backward instructions
//! - [`plutus`]: decode-or-fail access to the Plutus data carried in datums
//!   and redeemers

pub mod block;
pub mod error;
pub mod plutus;

pub use block::{Block, ChainEvent, Redeemer, RedeemerTag, Transaction, TxInput, TxOutput};
pub use error::{DecodeError, Result};
pub use plutus::{
    AcceptRedeemer, AssetClass, CancelRedeemer, FromPlutusData, OrderDatum, ToPlutusData,
};
