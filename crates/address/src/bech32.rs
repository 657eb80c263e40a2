//! Checksummed base-32 codec (BIP-173 bech32) over an arbitrary
//! human-readable prefix.
//!
//! Only the original bech32 checksum constant is supported; the modified
//! bech32m constant is not used by the chain's addresses. No total length
//! limit is enforced because Shelley base addresses exceed the 90 characters
//! BIP-173 allows for segwit.

use crate::error::{AddressError, MalformedReason, Result};

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const SEPARATOR: char = '1';
const CHECKSUM_LEN: usize = 6;
const PREFIX_MAX_LEN: usize = 83;
const PREFIX_MIN_CHAR: u8 = 33;
const PREFIX_MAX_CHAR: u8 = 126;
const GENERATOR: [u32; 5] = [0x3b6a_57b2, 0x2650_8e6d, 0x1ea1_19fa, 0x3d42_33dd, 0x2a14_62b3];
const CHECKSUM_CONSTANT: u32 = 1;

/// Encodes `payload` under `prefix`.
pub fn encode(payload: &[u8], prefix: &str) -> Result<String> {
    validate_prefix(prefix)?;
    let groups = convert_bits(payload, 8, 5, true)
        .map_err(AddressError::MalformedInput)?;
    Ok(encode_groups(prefix, &groups))
}

/// Decodes a bech32 string into its (lowercased) prefix and payload bytes.
pub fn decode(s: &str) -> Result<(String, Vec<u8>)> {
    let malformed = AddressError::MalformedInput;

    let has_lower = s.chars().any(|c| c.is_lowercase());
    let has_upper = s.chars().any(|c| c.is_uppercase());
    if has_lower && has_upper {
        return Err(malformed(MalformedReason::MixedCase));
    }
    let s = s.to_lowercase();

    let pos = s
        .rfind(SEPARATOR)
        .ok_or(malformed(MalformedReason::SeparatorPosition))?;
    if pos < 1 || pos + CHECKSUM_LEN + 1 > s.len() {
        return Err(malformed(MalformedReason::SeparatorPosition));
    }

    let (prefix, rest) = s.split_at(pos);
    let data = rest[1..]
        .chars()
        .map(|c| symbol_value(c).ok_or(malformed(MalformedReason::InvalidCharacter(c))))
        .collect::<Result<Vec<u8>>>()?;

    if !verify_checksum(prefix, &data) {
        return Err(malformed(MalformedReason::InvalidChecksum));
    }

    let payload = convert_bits(&data[..data.len() - CHECKSUM_LEN], 5, 8, false)
        .map_err(malformed)?;
    Ok((prefix.to_string(), payload))
}

/// Returns true if `s` decodes successfully.
pub fn validate(s: &str) -> bool {
    decode(s).is_ok()
}

/// Returns the human-readable part of `s` without verifying the checksum.
pub fn prefix_of(s: &str) -> Result<&str> {
    match s.rfind(SEPARATOR) {
        Some(pos) if pos >= 1 => Ok(&s[..pos]),
        _ => Err(AddressError::MalformedInput(
            MalformedReason::SeparatorPosition,
        )),
    }
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty()
        || prefix.len() > PREFIX_MAX_LEN
        || prefix
            .bytes()
            .any(|b| !(PREFIX_MIN_CHAR..=PREFIX_MAX_CHAR).contains(&b))
    {
        return Err(AddressError::InvalidPrefix);
    }
    Ok(())
}

/// Appends the checksum to already-regrouped 5-bit values and renders the string.
fn encode_groups(prefix: &str, groups: &[u8]) -> String {
    let checksum = create_checksum(prefix, groups);
    let mut out = String::with_capacity(prefix.len() + 1 + groups.len() + CHECKSUM_LEN);
    out.push_str(prefix);
    out.push(SEPARATOR);
    out.extend(
        groups
            .iter()
            .chain(checksum.iter())
            .map(|&g| char::from(CHARSET[usize::from(g)])),
    );
    out
}

fn symbol_value(c: char) -> Option<u8> {
    let c = u8::try_from(c).ok()?;
    CHARSET.iter().position(|&x| x == c).map(|i| i as u8)
}

fn expand_prefix(prefix: &str) -> Vec<u8> {
    let bytes = prefix.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * 2 + 1);
    out.extend(bytes.iter().map(|b| b >> 5));
    out.push(0);
    out.extend(bytes.iter().map(|b| b & 0x1f));
    out
}

fn polymod(values: impl IntoIterator<Item = u8>) -> u32 {
    let mut chk: u32 = 1;
    for value in values {
        let top = chk >> 25;
        chk = ((chk & 0x01ff_ffff) << 5) ^ u32::from(value);
        for (i, generator) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= generator;
            }
        }
    }
    chk
}

fn create_checksum(prefix: &str, groups: &[u8]) -> [u8; CHECKSUM_LEN] {
    let values = expand_prefix(prefix)
        .into_iter()
        .chain(groups.iter().copied())
        .chain([0u8; CHECKSUM_LEN]);
    let pm = polymod(values) ^ CHECKSUM_CONSTANT;

    let mut checksum = [0u8; CHECKSUM_LEN];
    for (i, slot) in checksum.iter_mut().enumerate() {
        *slot = ((pm >> (5 * (5 - i))) & 0x1f) as u8;
    }
    checksum
}

fn verify_checksum(prefix: &str, data: &[u8]) -> bool {
    let values = expand_prefix(prefix)
        .into_iter()
        .chain(data.iter().copied());
    polymod(values) == CHECKSUM_CONSTANT
}

/// Regroups `from`-bit values into `to`-bit values.
///
/// Input values must fit in `from` bits. With `pad`, leftover bits are
/// zero-filled into a final group; without it, leftovers must be fewer than
/// `from` bits and all zero.
fn convert_bits(
    data: &[u8],
    from: u32,
    to: u32,
    pad: bool,
) -> std::result::Result<Vec<u8>, MalformedReason> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let maxv: u32 = (1 << to) - 1;
    let max_acc: u32 = (1 << (from + to - 1)) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);

    for &value in data {
        debug_assert!(u32::from(value) >> from == 0);
        acc = ((acc << from) | u32::from(value)) & max_acc;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & maxv) as u8);
        }
    }

    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & maxv) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & maxv) != 0 {
        return Err(MalformedReason::InvalidPadding);
    }

    Ok(out)
}
