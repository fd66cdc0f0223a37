//! EVM chain identifiers.
//!
//! Wallet backends and indexers speak numeric chain ids (`137`), configuration
//! files are keyed by [CAIP-2](https://standards.chainagnostic.org/CAIPs/caip-2)
//! identifiers (`eip155:137`). [`ChainId`] accepts both and renders as CAIP-2.
//!
//! # Examples
//!
//! ```
//! use seqkit_types::chain::ChainId;
//!
//! let polygon: ChainId = "eip155:137".parse().unwrap();
//! assert_eq!(polygon, ChainId::new(137));
//! assert_eq!(polygon.to_string(), "eip155:137");
//!
//! let bare: ChainId = "137".parse().unwrap();
//! assert_eq!(bare.inner(), 137);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

use crate::networks;

/// The CAIP-2 namespace for EVM-compatible chains.
pub const EIP155_NAMESPACE: &str = "eip155";

/// A numeric chain id for EVM-compatible networks.
///
/// # Serialization
///
/// Serializes as a JSON number, the shape wallet backends and indexers expect.
/// Deserializes from a number, a decimal string, or a CAIP-2 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(u64);

impl ChainId {
    pub const fn new(chain_id: u64) -> Self {
        Self(chain_id)
    }

    /// Returns the numeric chain id.
    pub const fn inner(&self) -> u64 {
        self.0
    }

    /// Creates a chain id from a well-known network name (e.g., `"polygon"`).
    ///
    /// ```
    /// use seqkit_types::chain::ChainId;
    ///
    /// assert_eq!(ChainId::from_network_name("polygon"), Some(ChainId::new(137)));
    /// assert!(ChainId::from_network_name("unknown").is_none());
    /// ```
    pub fn from_network_name(network_name: &str) -> Option<Self> {
        networks::chain_id_by_network_name(network_name)
    }

    /// Returns the well-known network name for this chain id, if any.
    ///
    /// The name doubles as the indexer subdomain (`{name}-indexer.sequence.app`).
    pub fn as_network_name(&self) -> Option<&'static str> {
        networks::network_name_by_chain_id(*self)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", EIP155_NAMESPACE, self.0)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ChainId> for u64 {
    fn from(value: ChainId) -> Self {
        value.0
    }
}

impl PartialEq<u64> for ChainId {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

/// Error returned when parsing an invalid chain id.
#[derive(Debug, thiserror::Error)]
pub enum ChainIdFormatError {
    #[error("Invalid chain id format {0}")]
    InvalidFormat(String),
    #[error("Unexpected namespace {0}, expected eip155")]
    UnexpectedNamespace(String),
}

impl FromStr for ChainId {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reference = match s.split_once(':') {
            Some((namespace, reference)) => {
                if namespace != EIP155_NAMESPACE {
                    return Err(ChainIdFormatError::UnexpectedNamespace(namespace.into()));
                }
                reference
            }
            None => s,
        };
        reference
            .parse::<u64>()
            .map(ChainId)
            .map_err(|_| ChainIdFormatError::InvalidFormat(s.into()))
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChainIdVisitor;

        impl de::Visitor<'_> for ChainIdVisitor {
            type Value = ChainId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a numeric chain id or an eip155 CAIP-2 string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(ChainId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(ChainId)
                    .map_err(|_| de::Error::custom("chain id must be non-negative"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(ChainIdVisitor)
    }
}
