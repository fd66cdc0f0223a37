//! Solidity parameter types and how rule values are laid out in a calldata word.

use alloy_primitives::{Address, B256, Bytes, I256, U256};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Elementary Solidity types a parameter rule can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolParamType {
    Address,
    Bool,
    String,
    Bytes,
    /// `bytesN`, `1 <= N <= 32`.
    FixedBytes(usize),
    /// `uintN`, bit width.
    Uint(usize),
    /// `intN`, bit width.
    Int(usize),
}

impl SolParamType {
    /// Whether the type is encoded in place in the head of the calldata.
    pub fn is_static(&self) -> bool {
        !matches!(self, SolParamType::String | SolParamType::Bytes)
    }
}

impl Display for SolParamType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SolParamType::Address => f.write_str("address"),
            SolParamType::Bool => f.write_str("bool"),
            SolParamType::String => f.write_str("string"),
            SolParamType::Bytes => f.write_str("bytes"),
            SolParamType::FixedBytes(n) => write!(f, "bytes{n}"),
            SolParamType::Uint(n) => write!(f, "uint{n}"),
            SolParamType::Int(n) => write!(f, "int{n}"),
        }
    }
}

fn parse_width(suffix: &str, default: usize, valid: impl Fn(usize) -> bool) -> Option<usize> {
    if suffix.is_empty() {
        return Some(default);
    }
    // "uint08" is not a type
    if suffix.starts_with('0') {
        return None;
    }
    suffix.parse::<usize>().ok().filter(|n| valid(*n))
}

impl FromStr for SolParamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s {
            "address" => Some(SolParamType::Address),
            "bool" => Some(SolParamType::Bool),
            "string" => Some(SolParamType::String),
            "bytes" => Some(SolParamType::Bytes),
            _ => {
                let int_width = |n: usize| n % 8 == 0 && (8..=256).contains(&n);
                if let Some(suffix) = s.strip_prefix("uint") {
                    parse_width(suffix, 256, int_width).map(SolParamType::Uint)
                } else if let Some(suffix) = s.strip_prefix("int") {
                    parse_width(suffix, 256, int_width).map(SolParamType::Int)
                } else if let Some(suffix) = s.strip_prefix("bytes") {
                    parse_width(suffix, 32, |n| (1..=32).contains(&n))
                        .filter(|_| !suffix.is_empty())
                        .map(SolParamType::FixedBytes)
                } else {
                    None
                }
            }
        };
        parsed.ok_or_else(|| format!("unsupported parameter type '{s}'"))
    }
}

/// A rule value as written by the application, before it is checked against a type.
///
/// Deserializes from JSON booleans, integers and strings. Large or hex amounts
/// are given as strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValue {
    Bool(bool),
    Uint(U256),
    Int(I256),
    Address(Address),
    Bytes(Bytes),
    Text(String),
}

impl From<bool> for RuleValue {
    fn from(value: bool) -> Self {
        RuleValue::Bool(value)
    }
}

impl From<u64> for RuleValue {
    fn from(value: u64) -> Self {
        RuleValue::Uint(U256::from(value))
    }
}

impl From<U256> for RuleValue {
    fn from(value: U256) -> Self {
        RuleValue::Uint(value)
    }
}

impl From<I256> for RuleValue {
    fn from(value: I256) -> Self {
        RuleValue::Int(value)
    }
}

impl From<Address> for RuleValue {
    fn from(value: Address) -> Self {
        RuleValue::Address(value)
    }
}

impl From<Bytes> for RuleValue {
    fn from(value: Bytes) -> Self {
        RuleValue::Bytes(value)
    }
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        RuleValue::Text(value.to_owned())
    }
}

impl From<String> for RuleValue {
    fn from(value: String) -> Self {
        RuleValue::Text(value)
    }
}

impl<'de> Deserialize<'de> for RuleValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleValueVisitor;

        impl Visitor<'_> for RuleValueVisitor {
            type Value = RuleValue;

            fn expecting(&self, f: &mut Formatter) -> fmt::Result {
                f.write_str("a boolean, an integer or a string")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(RuleValue::Bool(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(RuleValue::Uint(U256::from(v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                I256::try_from(v)
                    .map(RuleValue::Int)
                    .map_err(|_| E::custom("integer out of range"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(RuleValue::Text(v.to_owned()))
            }
        }

        deserializer.deserialize_any(RuleValueVisitor)
    }
}

/// A value laid out as a calldata word together with the bits that are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedWord {
    pub value: B256,
    pub mask: B256,
}

fn low_bytes_mask(n: usize) -> B256 {
    let mut mask = B256::ZERO;
    mask[32 - n..].fill(0xff);
    mask
}

fn high_bytes_mask(n: usize) -> B256 {
    let mut mask = B256::ZERO;
    mask[..n].fill(0xff);
    mask
}

pub(crate) fn word(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

impl RuleValue {
    fn as_uint(&self) -> Result<U256, String> {
        match self {
            RuleValue::Uint(v) => Ok(*v),
            RuleValue::Int(v) if !v.is_negative() => Ok(v.into_raw()),
            RuleValue::Text(s) => U256::from_str(s.trim()).map_err(|e| e.to_string()),
            other => Err(format!("expected an unsigned integer, got {other:?}")),
        }
    }

    fn as_int(&self) -> Result<I256, String> {
        match self {
            RuleValue::Int(v) => Ok(*v),
            RuleValue::Uint(v) => I256::try_from(*v).map_err(|e| e.to_string()),
            RuleValue::Text(s) => I256::from_dec_str(s.trim()).map_err(|e| e.to_string()),
            other => Err(format!("expected a signed integer, got {other:?}")),
        }
    }

    fn as_address(&self) -> Result<Address, String> {
        match self {
            RuleValue::Address(a) => Ok(*a),
            RuleValue::Text(s) => Address::from_str(s.trim()).map_err(|e| e.to_string()),
            other => Err(format!("expected an address, got {other:?}")),
        }
    }

    fn as_bool(&self) -> Result<bool, String> {
        match self {
            RuleValue::Bool(b) => Ok(*b),
            RuleValue::Text(s) if s == "true" => Ok(true),
            RuleValue::Text(s) if s == "false" => Ok(false),
            other => Err(format!("expected a boolean, got {other:?}")),
        }
    }

    fn as_bytes(&self) -> Result<Bytes, String> {
        match self {
            RuleValue::Bytes(b) => Ok(b.clone()),
            RuleValue::Text(s) => Bytes::from_str(s.trim()).map_err(|e| e.to_string()),
            other => Err(format!("expected hex bytes, got {other:?}")),
        }
    }

    /// Lays the value out as `ty` is encoded in the calldata head.
    ///
    /// Dynamic types (`string`, `bytes`) have no single head word, see
    /// [`RuleValue::encode_tail`].
    pub fn encode(&self, ty: SolParamType) -> Result<EncodedWord, String> {
        match ty {
            SolParamType::Address => Ok(EncodedWord {
                value: self.as_address()?.into_word(),
                mask: low_bytes_mask(20),
            }),
            SolParamType::Bool => Ok(EncodedWord {
                value: word(U256::from(self.as_bool()? as u8)),
                mask: B256::repeat_byte(0xff),
            }),
            SolParamType::Uint(bits) => {
                let value = self.as_uint()?;
                if value.bit_len() > bits {
                    return Err(format!("{value} does not fit in uint{bits}"));
                }
                Ok(EncodedWord {
                    value: word(value),
                    mask: word(U256::MAX >> (256 - bits)),
                })
            }
            SolParamType::Int(bits) => {
                let value = self.as_int()?;
                let raw = value.into_raw();
                // The bits above the sign bit must all repeat it.
                let high = raw >> (bits - 1);
                let fits = if value.is_negative() {
                    high == U256::MAX >> (bits - 1)
                } else {
                    high.is_zero()
                };
                if !fits {
                    return Err(format!("{value} does not fit in int{bits}"));
                }
                Ok(EncodedWord {
                    value: word(raw),
                    mask: B256::repeat_byte(0xff),
                })
            }
            SolParamType::FixedBytes(n) => {
                let bytes = self.as_bytes()?;
                if bytes.len() > n {
                    return Err(format!("{} bytes do not fit in bytes{n}", bytes.len()));
                }
                let mut value = B256::ZERO;
                value[..bytes.len()].copy_from_slice(&bytes);
                Ok(EncodedWord {
                    value,
                    mask: high_bytes_mask(n),
                })
            }
            SolParamType::String | SolParamType::Bytes => Err(format!(
                "{ty} is dynamic and has no single calldata word"
            )),
        }
    }

    fn dynamic_contents(&self, ty: SolParamType) -> Result<Bytes, String> {
        match (ty, self) {
            (SolParamType::String, RuleValue::Text(s)) => Ok(Bytes::copy_from_slice(s.as_bytes())),
            (SolParamType::String, other) => Err(format!("expected a string, got {other:?}")),
            (SolParamType::Bytes, _) => self.as_bytes(),
            (other, _) => Err(format!("{other} is not a dynamic type")),
        }
    }

    /// Lays a `string` or `bytes` value out as its calldata tail: the length
    /// word, then the contents in 32-byte words. The last word's mask covers
    /// only the bytes in use.
    pub fn encode_tail(&self, ty: SolParamType) -> Result<Vec<EncodedWord>, String> {
        let contents = self.dynamic_contents(ty)?;
        let mut words = Vec::with_capacity(1 + contents.len().div_ceil(32));
        words.push(EncodedWord {
            value: word(U256::from(contents.len())),
            mask: B256::repeat_byte(0xff),
        });
        for chunk in contents.chunks(32) {
            let mut value = B256::ZERO;
            value[..chunk.len()].copy_from_slice(chunk);
            words.push(EncodedWord {
                value,
                mask: high_bytes_mask(chunk.len()),
            });
        }
        Ok(words)
    }
}
