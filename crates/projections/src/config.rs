//! Projection configuration loaded from environment variables.

use common::Hash28;

use crate::{ProjectionError, Result};

/// Script hash of the order-book validator on mainnet.
pub const DEFAULT_ORDER_BOOK_SCRIPT_HASH: &str =
    "0f45963b8e895bd46839bbcf34185993440f26e3f07c668bd2026f92";

const DEFAULT_SCRIPT_HASH_BYTES: [u8; Hash28::LEN] = [
    0x0f, 0x45, 0x96, 0x3b, 0x8e, 0x89, 0x5b, 0xd4, 0x68, 0x39, 0xbb, 0xcf, 0x34, 0x18, 0x59, 0x93,
    0x44, 0x0f, 0x26, 0xe3, 0xf0, 0x7c, 0x66, 0x8b, 0xd2, 0x02, 0x6f, 0x92,
];

/// Settings shared by the projectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionConfig {
    /// Outputs locked by this script are tracked as orders.
    pub order_book_script_hash: Hash28,
}

impl ProjectionConfig {
    /// Loads configuration from environment variables.
    ///
    /// - `ORDER_BOOK_SCRIPT_HASH`: hex script hash (default: the mainnet validator)
    pub fn from_env() -> Result<Self> {
        let script_hash = std::env::var("ORDER_BOOK_SCRIPT_HASH")
            .unwrap_or_else(|_| DEFAULT_ORDER_BOOK_SCRIPT_HASH.to_string());
        Self::with_script_hash(&script_hash)
    }

    /// Builds a configuration from a hex script hash.
    pub fn with_script_hash(hex: &str) -> Result<Self> {
        let order_book_script_hash = hex.trim().parse().map_err(|e| {
            ProjectionError::Config(format!("ORDER_BOOK_SCRIPT_HASH '{hex}': {e}"))
        })?;
        Ok(Self {
            order_book_script_hash,
        })
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            order_book_script_hash: Hash28::new(DEFAULT_SCRIPT_HASH_BYTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_mainnet_validator() {
        let config = ProjectionConfig::default();
        assert_eq!(
            config.order_book_script_hash.to_hex(),
            DEFAULT_ORDER_BOOK_SCRIPT_HASH
        );
        assert_eq!(
            ProjectionConfig::with_script_hash(DEFAULT_ORDER_BOOK_SCRIPT_HASH).unwrap(),
            config
        );
    }

    #[test]
    fn rejects_bad_hex_and_wrong_length() {
        assert!(matches!(
            ProjectionConfig::with_script_hash("zz"),
            Err(ProjectionError::Config(_))
        ));
        assert!(matches!(
            ProjectionConfig::with_script_hash(&"ab".repeat(32)),
            Err(ProjectionError::Config(_))
        ));
    }
}
