//! Address codec and translation errors.

use thiserror::Error;

/// Why a bech32 string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("mixed-case string")]
    MixedCase,

    #[error("invalid separator position")]
    SeparatorPosition,

    #[error("invalid data character {0:?}")]
    InvalidCharacter(char),

    #[error("invalid checksum")]
    InvalidChecksum,

    #[error("invalid padding")]
    InvalidPadding,
}

/// Errors raised while encoding, decoding or interpreting addresses.
///
/// All variants are recoverable: callers treat them as "address unresolved".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The human-readable prefix is empty, too long, or has a non-printable character.
    #[error("invalid human-readable prefix")]
    InvalidPrefix,

    /// The bech32 string failed structural or checksum validation.
    #[error("malformed bech32 input: {0}")]
    MalformedInput(MalformedReason),

    /// The header type nibble is reserved.
    #[error("unsupported address type nibble {0:#x}")]
    UnsupportedAddressType(u8),

    /// The header network nibble is neither testnet nor mainnet.
    #[error("unknown network nibble {0:#x}")]
    UnknownNetwork(u8),
}

/// Result type for address operations.
pub type Result<T> = std::result::Result<T, AddressError>;
