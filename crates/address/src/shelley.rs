//! Shelley-era address header interpretation.
//!
//! Every Shelley address starts with a header byte: the high nibble selects
//! the address kind (base, pointer, enterprise, reward and the key/script
//! flavour of each credential), the low nibble the network. The remaining
//! bytes are the credentials in order: payment hash, then stake hash or
//! pointer. Byron bootstrap addresses (nibbles 8 to 11) are recognised and
//! rejected; they are never decoded.

use common::{Hash28, Network};

use crate::bech32;
use crate::error::{AddressError, Result};

/// Length of a credential hash.
pub const HASH_LEN: usize = Hash28::LEN;

const PAYMENT_OFFSET: usize = 1;
const STAKE_OFFSET: usize = PAYMENT_OFFSET + HASH_LEN;
const MIN_PAYMENT_LEN: usize = STAKE_OFFSET;
const MIN_BASE_LEN: usize = STAKE_OFFSET + HASH_LEN;

/// Address kind encoded by the header type nibble.
///
/// The enum is closed over all sixteen nibble values: Byron and reserved
/// nibbles keep their raw value so the mapping stays lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    BaseKeyKey,
    BaseScriptKey,
    BaseKeyScript,
    BaseScriptScript,
    PointerKey,
    PointerScript,
    EnterpriseKey,
    EnterpriseScript,
    Byron(u8),
    Reserved(u8),
    RewardKey,
    RewardScript,
}

const KIND_TABLE: [AddressKind; 16] = [
    AddressKind::BaseKeyKey,
    AddressKind::BaseScriptKey,
    AddressKind::BaseKeyScript,
    AddressKind::BaseScriptScript,
    AddressKind::PointerKey,
    AddressKind::PointerScript,
    AddressKind::EnterpriseKey,
    AddressKind::EnterpriseScript,
    AddressKind::Byron(8),
    AddressKind::Byron(9),
    AddressKind::Byron(10),
    AddressKind::Byron(11),
    AddressKind::Reserved(12),
    AddressKind::Reserved(13),
    AddressKind::RewardKey,
    AddressKind::RewardScript,
];

/// Structural class of an address, independent of credential flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressClass {
    Base,
    Pointer,
    Enterprise,
    Reward,
}

impl AddressKind {
    /// Looks up the kind for a type nibble (only the low four bits are used).
    pub fn from_nibble(nibble: u8) -> Self {
        KIND_TABLE[usize::from(nibble & 0x0f)]
    }

    /// Returns the type nibble for this kind.
    pub fn nibble(&self) -> u8 {
        match self {
            AddressKind::BaseKeyKey => 0,
            AddressKind::BaseScriptKey => 1,
            AddressKind::BaseKeyScript => 2,
            AddressKind::BaseScriptScript => 3,
            AddressKind::PointerKey => 4,
            AddressKind::PointerScript => 5,
            AddressKind::EnterpriseKey => 6,
            AddressKind::EnterpriseScript => 7,
            AddressKind::Byron(n) | AddressKind::Reserved(n) => *n,
            AddressKind::RewardKey => 14,
            AddressKind::RewardScript => 15,
        }
    }

    /// Returns the structural class, or `None` for Byron and reserved nibbles.
    pub fn class(&self) -> Option<AddressClass> {
        match self {
            AddressKind::BaseKeyKey
            | AddressKind::BaseScriptKey
            | AddressKind::BaseKeyScript
            | AddressKind::BaseScriptScript => Some(AddressClass::Base),
            AddressKind::PointerKey | AddressKind::PointerScript => Some(AddressClass::Pointer),
            AddressKind::EnterpriseKey | AddressKind::EnterpriseScript => {
                Some(AddressClass::Enterprise)
            }
            AddressKind::RewardKey | AddressKind::RewardScript => Some(AddressClass::Reward),
            AddressKind::Byron(_) | AddressKind::Reserved(_) => None,
        }
    }

    /// True when the first credential is a script hash.
    ///
    /// For reward addresses the single credential counts as the payment one.
    pub fn payment_is_script(&self) -> bool {
        matches!(
            self,
            AddressKind::BaseScriptKey
                | AddressKind::BaseScriptScript
                | AddressKind::PointerScript
                | AddressKind::EnterpriseScript
                | AddressKind::RewardScript
        )
    }

    /// True when a base address delegates to a script stake credential.
    pub fn stake_is_script(&self) -> bool {
        matches!(
            self,
            AddressKind::BaseKeyScript | AddressKind::BaseScriptScript
        )
    }

    fn carries_payment_key_hash(&self) -> bool {
        matches!(
            self,
            AddressKind::BaseKeyKey
                | AddressKind::BaseKeyScript
                | AddressKind::PointerKey
                | AddressKind::EnterpriseKey
        )
    }

    fn carries_stake_key_hash(&self) -> bool {
        matches!(self, AddressKind::BaseKeyKey | AddressKind::BaseScriptKey)
    }

    fn carries_payment_credential(&self) -> bool {
        matches!(
            self.class(),
            Some(AddressClass::Base | AddressClass::Pointer | AddressClass::Enterprise)
        )
    }
}

/// A parsed header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressHeader {
    pub kind: AddressKind,
    pub network_nibble: u8,
}

impl AddressHeader {
    /// Splits a header byte into kind and network nibble.
    pub fn parse(byte: u8) -> Self {
        Self {
            kind: AddressKind::from_nibble(byte >> 4),
            network_nibble: byte & 0x0f,
        }
    }

    /// Packs a kind and network into a header byte.
    pub fn pack(kind: AddressKind, network: Network) -> u8 {
        (kind.nibble() << 4) | network.nibble()
    }

    /// Network named by the low nibble, if it is a known one.
    pub fn network(&self) -> Option<Network> {
        Network::from_nibble(self.network_nibble)
    }
}

/// A payment or stake credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Credential {
    KeyHash(Hash28),
    ScriptHash(Hash28),
}

impl Credential {
    /// Builds a key-hash credential; `None` unless `bytes` is exactly 28 long.
    pub fn key_hash(bytes: &[u8]) -> Option<Self> {
        Hash28::from_slice(bytes).map(Credential::KeyHash)
    }

    /// Builds a script-hash credential; `None` unless `bytes` is exactly 28 long.
    pub fn script_hash(bytes: &[u8]) -> Option<Self> {
        Hash28::from_slice(bytes).map(Credential::ScriptHash)
    }

    /// Returns the underlying hash.
    pub fn hash(&self) -> &Hash28 {
        match self {
            Credential::KeyHash(h) | Credential::ScriptHash(h) => h,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Credential::ScriptHash(_))
    }
}

/// A structured base or enterprise address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShelleyAddress {
    pub payment: Credential,
    pub stake: Option<Credential>,
}

impl ShelleyAddress {
    pub fn new(payment: Credential, stake: Option<Credential>) -> Self {
        Self { payment, stake }
    }

    /// Kind produced for this credential combination.
    ///
    /// Only base and enterprise kinds are constructed in this direction.
    pub fn kind(&self) -> AddressKind {
        match (self.payment.is_script(), self.stake.map(|s| s.is_script())) {
            (false, Some(false)) => AddressKind::BaseKeyKey,
            (true, Some(false)) => AddressKind::BaseScriptKey,
            (false, Some(true)) => AddressKind::BaseKeyScript,
            (true, Some(true)) => AddressKind::BaseScriptScript,
            (false, None) => AddressKind::EnterpriseKey,
            (true, None) => AddressKind::EnterpriseScript,
        }
    }

    /// Serializes to `header ++ payment ++ [stake]`.
    pub fn to_bytes(&self, network: Network) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_BASE_LEN);
        out.push(AddressHeader::pack(self.kind(), network));
        out.extend_from_slice(self.payment.hash().as_bytes());
        if let Some(stake) = &self.stake {
            out.extend_from_slice(stake.hash().as_bytes());
        }
        out
    }

    /// Renders the bech32 string with the `addr`/`addr_test` prefix.
    pub fn to_bech32(&self, network: Network) -> Option<String> {
        let prefix = prefix_for(AddressClass::Base, network);
        bech32::encode(&self.to_bytes(network), prefix).ok()
    }

    /// Parses a base or enterprise address, returning it with its network.
    ///
    /// Pointer, reward, Byron and truncated inputs yield `None`.
    pub fn from_bytes(bytes: &[u8]) -> Option<(Self, Network)> {
        let header = AddressHeader::parse(*bytes.first()?);
        let network = header.network()?;
        let kind = header.kind;

        let payment_bytes = bytes.get(PAYMENT_OFFSET..STAKE_OFFSET)?;
        let payment = if kind.payment_is_script() {
            Credential::script_hash(payment_bytes)?
        } else {
            Credential::key_hash(payment_bytes)?
        };

        let stake = match kind.class()? {
            AddressClass::Base if bytes.len() == MIN_BASE_LEN => {
                let stake_bytes = &bytes[STAKE_OFFSET..MIN_BASE_LEN];
                Some(if kind.stake_is_script() {
                    Credential::script_hash(stake_bytes)?
                } else {
                    Credential::key_hash(stake_bytes)?
                })
            }
            AddressClass::Enterprise if bytes.len() == MIN_PAYMENT_LEN => None,
            _ => return None,
        };

        Some((Self { payment, stake }, network))
    }
}

fn prefix_for(class: AddressClass, network: Network) -> &'static str {
    match (class, network) {
        (AddressClass::Reward, Network::Mainnet) => "stake",
        (AddressClass::Reward, Network::Testnet) => "stake_test",
        (_, Network::Mainnet) => "addr",
        (_, Network::Testnet) => "addr_test",
    }
}

/// Renders raw address bytes as their canonical bech32 string.
///
/// Empty input and Byron addresses yield `Ok(None)`, as does a codec
/// failure. Unknown networks and reserved type nibbles are errors.
pub fn bech32_from_bytes(bytes: &[u8]) -> Result<Option<String>> {
    let Some(&header) = bytes.first() else {
        return Ok(None);
    };
    let header = AddressHeader::parse(header);

    if let AddressKind::Byron(_) = header.kind {
        return Ok(None);
    }

    let network = header
        .network()
        .ok_or(AddressError::UnknownNetwork(header.network_nibble))?;

    let class = match header.kind {
        AddressKind::Reserved(nibble) => return Err(AddressError::UnsupportedAddressType(nibble)),
        kind => kind
            .class()
            .ok_or(AddressError::UnsupportedAddressType(kind.nibble()))?,
    };

    Ok(bech32::encode(bytes, prefix_for(class, network)).ok())
}

/// Like [`bech32_from_bytes`] but folds every failure into `None`.
pub fn resolve(bytes: &[u8]) -> Option<String> {
    match bech32_from_bytes(bytes) {
        Ok(Some(address)) => Some(address),
        Ok(None) => {
            tracing::debug!(len = bytes.len(), "address not representable as bech32");
            None
        }
        Err(error) => {
            tracing::debug!(%error, "address unresolved");
            None
        }
    }
}

/// Payment key hash of a key-payment address (base, pointer or enterprise).
///
/// Script-payment, reward, Byron and short inputs yield `None`.
pub fn payment_key_hash(bytes: &[u8]) -> Option<Hash28> {
    let header = AddressHeader::parse(*bytes.first()?);
    if !header.kind.carries_payment_key_hash() || bytes.len() < MIN_PAYMENT_LEN {
        return None;
    }
    Hash28::from_slice(&bytes[PAYMENT_OFFSET..STAKE_OFFSET])
}

/// Stake key hash of a base address whose stake credential is a key.
///
/// Pointer stake references and reward-address credentials are not
/// reported here.
pub fn stake_key_hash(bytes: &[u8]) -> Option<Hash28> {
    let header = AddressHeader::parse(*bytes.first()?);
    if !header.kind.carries_stake_key_hash() || bytes.len() < MIN_BASE_LEN {
        return None;
    }
    Hash28::from_slice(&bytes[STAKE_OFFSET..MIN_BASE_LEN])
}

/// Payment credential (key or script) of a base, pointer or enterprise address.
pub fn payment_credential(bytes: &[u8]) -> Option<Credential> {
    let header = AddressHeader::parse(*bytes.first()?);
    if !header.kind.carries_payment_credential() || bytes.len() < MIN_PAYMENT_LEN {
        return None;
    }
    let hash = &bytes[PAYMENT_OFFSET..STAKE_OFFSET];
    if header.kind.payment_is_script() {
        Credential::script_hash(hash)
    } else {
        Credential::key_hash(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYMENT: [u8; 28] = [0x11; 28];
    const STAKE: [u8; 28] = [0x22; 28];

    fn address_with_header(header: u8, len: usize) -> Vec<u8> {
        let mut bytes = vec![header];
        bytes.extend((1..len).map(|i| i as u8));
        bytes
    }

    fn all_constructible() -> Vec<ShelleyAddress> {
        let key = |b| Credential::KeyHash(Hash28::new(b));
        let script = |b| Credential::ScriptHash(Hash28::new(b));
        vec![
            ShelleyAddress::new(key(PAYMENT), Some(key(STAKE))),
            ShelleyAddress::new(script(PAYMENT), Some(key(STAKE))),
            ShelleyAddress::new(key(PAYMENT), Some(script(STAKE))),
            ShelleyAddress::new(script(PAYMENT), Some(script(STAKE))),
            ShelleyAddress::new(key(PAYMENT), None),
            ShelleyAddress::new(script(PAYMENT), None),
        ]
    }

    #[test]
    fn kind_table_covers_every_nibble() {
        for nibble in 0u8..16 {
            assert_eq!(AddressKind::from_nibble(nibble).nibble(), nibble);
        }
        assert_eq!(AddressKind::from_nibble(8), AddressKind::Byron(8));
        assert_eq!(AddressKind::from_nibble(11), AddressKind::Byron(11));
        assert_eq!(AddressKind::from_nibble(12), AddressKind::Reserved(12));
        assert_eq!(AddressKind::from_nibble(13).class(), None);
        assert_eq!(
            AddressKind::from_nibble(14).class(),
            Some(AddressClass::Reward)
        );
        assert_eq!(
            AddressKind::from_nibble(5).class(),
            Some(AddressClass::Pointer)
        );
    }

    #[test]
    fn credential_flags_follow_table() {
        assert!(!AddressKind::BaseKeyKey.payment_is_script());
        assert!(AddressKind::BaseScriptKey.payment_is_script());
        assert!(AddressKind::BaseKeyScript.stake_is_script());
        assert!(AddressKind::BaseScriptScript.payment_is_script());
        assert!(AddressKind::BaseScriptScript.stake_is_script());
        assert!(AddressKind::EnterpriseScript.payment_is_script());
        assert!(!AddressKind::EnterpriseKey.stake_is_script());
    }

    #[test]
    fn constructs_expected_headers() {
        let nibbles: Vec<u8> = all_constructible().iter().map(|a| a.kind().nibble()).collect();
        assert_eq!(nibbles, vec![0, 1, 2, 3, 6, 7]);

        let base = all_constructible()[0];
        let bytes = base.to_bytes(Network::Mainnet);
        assert_eq!(bytes.len(), 57);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(&bytes[1..29], &PAYMENT);
        assert_eq!(&bytes[29..57], &STAKE);

        let enterprise_script = all_constructible()[5];
        let bytes = enterprise_script.to_bytes(Network::Testnet);
        assert_eq!(bytes.len(), 29);
        assert_eq!(bytes[0], 0x70);
    }

    #[test]
    fn prefixes_follow_network() {
        let base = all_constructible()[0];
        assert!(base.to_bech32(Network::Mainnet).unwrap().starts_with("addr1"));
        assert!(base.to_bech32(Network::Testnet).unwrap().starts_with("addr_test1"));
    }

    #[test]
    fn credentials_require_exact_hash_length() {
        assert!(Credential::key_hash(&[0; 28]).is_some());
        assert!(Credential::key_hash(&[0; 27]).is_none());
        assert!(Credential::script_hash(&[0; 32]).is_none());
    }

    #[test]
    fn round_trip_preserves_bytes_and_hashes() {
        for network in [Network::Mainnet, Network::Testnet] {
            for address in all_constructible() {
                let bytes = address.to_bytes(network);
                let encoded = bech32_from_bytes(&bytes).unwrap().unwrap();
                assert_eq!(address.to_bech32(network).as_deref(), Some(encoded.as_str()));

                let (_, decoded) = crate::bech32::decode(&encoded).unwrap();
                assert_eq!(decoded, bytes);
                assert_eq!(payment_key_hash(&decoded), payment_key_hash(&bytes));
                assert_eq!(stake_key_hash(&decoded), stake_key_hash(&bytes));
                assert_eq!(ShelleyAddress::from_bytes(&decoded), Some((address, network)));
            }
        }
    }

    #[test]
    fn byron_and_empty_inputs_are_not_translated() {
        assert_eq!(bech32_from_bytes(&[]), Ok(None));
        for nibble in 8u8..=11 {
            let bytes = address_with_header(nibble << 4, 40);
            assert_eq!(bech32_from_bytes(&bytes), Ok(None));
        }
    }

    #[test]
    fn reserved_nibbles_are_unsupported() {
        for nibble in [12u8, 13] {
            let bytes = address_with_header((nibble << 4) | 1, 29);
            assert_eq!(
                bech32_from_bytes(&bytes),
                Err(AddressError::UnsupportedAddressType(nibble))
            );
        }
    }

    #[test]
    fn unknown_network_is_rejected() {
        let bytes = address_with_header(0x02, 57);
        assert_eq!(
            bech32_from_bytes(&bytes),
            Err(AddressError::UnknownNetwork(2))
        );
        assert_eq!(resolve(&bytes), None);
    }

    #[test]
    fn reward_addresses_use_stake_prefix() {
        let mainnet = address_with_header(0xe1, 29);
        assert!(resolve(&mainnet).unwrap().starts_with("stake1"));
        let testnet = address_with_header(0xf0, 29);
        assert!(resolve(&testnet).unwrap().starts_with("stake_test1"));
    }

    #[test]
    fn pointer_addresses_translate_without_parsing_pointer() {
        let bytes = address_with_header(0x41, 32);
        assert!(resolve(&bytes).unwrap().starts_with("addr1"));
        assert!(ShelleyAddress::from_bytes(&bytes).is_none());
        assert!(payment_key_hash(&bytes).is_some());
        assert_eq!(stake_key_hash(&bytes), None);
    }

    #[test]
    fn script_payment_never_yields_key_hash() {
        for nibble in [1u8, 3, 5, 7] {
            for len in 0..80 {
                let bytes = address_with_header((nibble << 4) | 1, len.max(1));
                assert_eq!(payment_key_hash(&bytes), None, "nibble {nibble} len {len}");
            }
        }
    }

    #[test]
    fn payment_key_hash_needs_header_and_hash() {
        for nibble in [0u8, 2, 4, 6] {
            let bytes = address_with_header(nibble << 4, 29);
            assert_eq!(payment_key_hash(&bytes).unwrap().as_bytes(), &bytes[1..29]);
            assert_eq!(payment_key_hash(&bytes[..28]), None);
        }
        assert_eq!(payment_key_hash(&[]), None);
        assert_eq!(payment_key_hash(&address_with_header(0xe1, 57)), None);
        assert_eq!(payment_key_hash(&address_with_header(0x81, 57)), None);
    }

    #[test]
    fn stake_key_hash_only_for_key_stake_base_addresses() {
        for nibble in [0u8, 1] {
            let bytes = address_with_header(nibble << 4, 57);
            assert_eq!(stake_key_hash(&bytes).unwrap().as_bytes(), &bytes[29..57]);
            assert_eq!(stake_key_hash(&bytes[..56]), None);
        }
        for nibble in [2u8, 3, 4, 5, 6, 7, 8, 12, 14, 15] {
            let bytes = address_with_header(nibble << 4, 64);
            assert_eq!(stake_key_hash(&bytes), None, "nibble {nibble}");
        }
    }

    #[test]
    fn payment_credential_reports_scripts() {
        let script = all_constructible()[5].to_bytes(Network::Mainnet);
        assert_eq!(
            payment_credential(&script),
            Some(Credential::ScriptHash(Hash28::new(PAYMENT)))
        );
        let key = all_constructible()[2].to_bytes(Network::Mainnet);
        assert_eq!(
            payment_credential(&key),
            Some(Credential::KeyHash(Hash28::new(PAYMENT)))
        );
        assert_eq!(payment_credential(&address_with_header(0xe1, 29)), None);
        assert_eq!(payment_credential(&script[..20]), None);
    }
}
