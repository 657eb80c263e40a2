//! Address codec and translator for the chain's Shelley-era addresses.
//!
//! - [`bech32`]: checksummed base-32 strings over any human-readable prefix
//! - [`shelley`]: header-byte interpretation, binary to bech32 translation and
//!   byte-level key-hash extraction

pub mod bech32;
pub mod error;
pub mod shelley;

pub use error::{AddressError, MalformedReason, Result};
pub use shelley::{
    AddressClass, AddressHeader, AddressKind, Credential, ShelleyAddress, bech32_from_bytes,
    payment_credential, payment_key_hash, resolve, stake_key_hash,
};
