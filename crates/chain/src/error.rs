//! Plutus data decoding errors.

use thiserror::Error;

/// Errors raised when raw CBOR does not decode into the requested shape.
///
/// Projectors treat every variant as "not this shape" and never escalate it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The bytes are not well-formed CBOR.
    #[error("CBOR error: {0}")]
    Cbor(String),

    /// Extra bytes follow the decoded item.
    #[error("trailing bytes after CBOR item")]
    TrailingBytes,

    /// The item has the wrong CBOR major type.
    #[error("expected {expected}")]
    UnexpectedShape { expected: &'static str },

    /// A constructor with a different alternative index was found.
    #[error("expected constructor {expected}, found {found}")]
    ConstructorMismatch { expected: u64, found: u64 },

    /// A constructor carries the wrong number of fields.
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// An integer does not fit the target type.
    #[error("integer out of range")]
    IntegerOutOfRange,
}

/// Result type for decoding operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
