//! Plutus data shapes carried in datums and redeemers.
//!
//! Plutus data constructors are CBOR tags: alternatives 0 to 6 use tags 121
//! to 127, alternatives 7 to 127 use tags 1280 to 1400, and any alternative
//! may use the general form tag 102 over `[index, fields]`.

use std::io::Cursor;

use ciborium::value::Value;

use crate::error::{DecodeError, Result};

const COMPACT_TAG_BASE: u64 = 121;
const COMPACT_TAG_MAX: u64 = 127;
const EXTENDED_TAG_BASE: u64 = 1280;
const EXTENDED_TAG_MAX: u64 = 1400;
const GENERAL_TAG: u64 = 102;

/// Types decodable from a Plutus data item.
pub trait FromPlutusData: Sized {
    fn from_plutus(value: &Value) -> Result<Self>;
}

/// Types encodable as a Plutus data item.
pub trait ToPlutusData {
    fn to_plutus(&self) -> Value;
}

/// Decodes raw CBOR bytes as `T`, failing on any shape mismatch.
pub fn decode<T: FromPlutusData>(bytes: &[u8]) -> Result<T> {
    let mut cursor = Cursor::new(bytes);
    let value: Value =
        ciborium::de::from_reader(&mut cursor).map_err(|e| DecodeError::Cbor(e.to_string()))?;
    if cursor.position() != bytes.len() as u64 {
        return Err(DecodeError::TrailingBytes);
    }
    T::from_plutus(&value)
}

/// Encodes `value` as CBOR bytes.
pub fn encode<T: ToPlutusData>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(&value.to_plutus(), &mut out)
        .expect("writing CBOR into a Vec cannot fail");
    out
}

/// Splits a constructor into its alternative index and fields.
pub fn constr(value: &Value) -> Result<(u64, &[Value])> {
    let not_constr = DecodeError::UnexpectedShape {
        expected: "constructor",
    };
    let Value::Tag(tag, inner) = value else {
        return Err(not_constr);
    };
    let tag = *tag;

    match tag {
        COMPACT_TAG_BASE..=COMPACT_TAG_MAX => Ok((tag - COMPACT_TAG_BASE, array(inner)?)),
        EXTENDED_TAG_BASE..=EXTENDED_TAG_MAX => Ok((tag - EXTENDED_TAG_BASE + 7, array(inner)?)),
        GENERAL_TAG => match array(inner)? {
            [index, fields] => Ok((uint(index)?, array(fields)?)),
            other => Err(DecodeError::FieldCount {
                expected: 2,
                found: other.len(),
            }),
        },
        _ => Err(not_constr),
    }
}

/// Builds a constructor item using the most compact tag for `index`.
pub fn constr_value(index: u64, fields: Vec<Value>) -> Value {
    match index {
        0..=6 => Value::Tag(COMPACT_TAG_BASE + index, Box::new(Value::Array(fields))),
        7..=127 => Value::Tag(EXTENDED_TAG_BASE + index - 7, Box::new(Value::Array(fields))),
        _ => Value::Tag(
            GENERAL_TAG,
            Box::new(Value::Array(vec![
                Value::Integer(index.into()),
                Value::Array(fields),
            ])),
        ),
    }
}

/// Expects constructor `index` with exactly `arity` fields.
pub fn expect_constr(value: &Value, index: u64, arity: usize) -> Result<&[Value]> {
    let (found, fields) = constr(value)?;
    if found != index {
        return Err(DecodeError::ConstructorMismatch {
            expected: index,
            found,
        });
    }
    if fields.len() != arity {
        return Err(DecodeError::FieldCount {
            expected: arity,
            found: fields.len(),
        });
    }
    Ok(fields)
}

pub fn array(value: &Value) -> Result<&[Value]> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(DecodeError::UnexpectedShape { expected: "array" }),
    }
}

pub fn bytes(value: &Value) -> Result<&[u8]> {
    match value {
        Value::Bytes(b) => Ok(b),
        _ => Err(DecodeError::UnexpectedShape {
            expected: "byte string",
        }),
    }
}

pub fn uint(value: &Value) -> Result<u64> {
    match value {
        Value::Integer(i) => u64::try_from(*i).map_err(|_| DecodeError::IntegerOutOfRange),
        _ => Err(DecodeError::UnexpectedShape {
            expected: "integer",
        }),
    }
}

/// Policy id and asset name of a native asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetClass {
    pub policy_id: Vec<u8>,
    pub asset_name: Vec<u8>,
}

impl FromPlutusData for AssetClass {
    fn from_plutus(value: &Value) -> Result<Self> {
        // Encoded either as a bare pair or as constructor 0 over the pair.
        let pair = match value {
            Value::Array(items) => items.as_slice(),
            other => expect_constr(other, 0, 2)?,
        };
        match pair {
            [policy, name] => Ok(Self {
                policy_id: bytes(policy)?.to_vec(),
                asset_name: bytes(name)?.to_vec(),
            }),
            other => Err(DecodeError::FieldCount {
                expected: 2,
                found: other.len(),
            }),
        }
    }
}

impl ToPlutusData for AssetClass {
    fn to_plutus(&self) -> Value {
        Value::Array(vec![
            Value::Bytes(self.policy_id.clone()),
            Value::Bytes(self.asset_name.clone()),
        ])
    }
}

/// Datum locked at the order-book script: who listed, what, and how much.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDatum {
    pub owner: Vec<u8>,
    pub asset: AssetClass,
    pub quantity: u64,
}

impl FromPlutusData for OrderDatum {
    fn from_plutus(value: &Value) -> Result<Self> {
        let [owner, asset, quantity] = expect_constr(value, 0, 3)? else {
            unreachable!("expect_constr checked the arity");
        };
        Ok(Self {
            owner: bytes(owner)?.to_vec(),
            asset: AssetClass::from_plutus(asset)?,
            quantity: uint(quantity)?,
        })
    }
}

impl ToPlutusData for OrderDatum {
    fn to_plutus(&self) -> Value {
        constr_value(
            0,
            vec![
                Value::Bytes(self.owner.clone()),
                self.asset.to_plutus(),
                Value::Integer(self.quantity.into()),
            ],
        )
    }
}

/// Redeemer spending an order to buy it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptRedeemer;

impl FromPlutusData for AcceptRedeemer {
    fn from_plutus(value: &Value) -> Result<Self> {
        expect_constr(value, 0, 0).map(|_| AcceptRedeemer)
    }
}

impl ToPlutusData for AcceptRedeemer {
    fn to_plutus(&self) -> Value {
        constr_value(0, Vec::new())
    }
}

/// Redeemer spending an order to withdraw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelRedeemer;

impl FromPlutusData for CancelRedeemer {
    fn from_plutus(value: &Value) -> Result<Self> {
        expect_constr(value, 1, 0).map(|_| CancelRedeemer)
    }
}

impl ToPlutusData for CancelRedeemer {
    fn to_plutus(&self) -> Value {
        constr_value(1, Vec::new())
    }
}
