//! The EVM call that is the unit of dispatch.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::util::decimal_u256_opt;

/// A single EVM call: target, optional calldata, optional native value.
///
/// ```
/// use alloy_primitives::{address, U256};
/// use seqkit_types::transaction::Transaction;
///
/// let tx = Transaction::new(address!("0x0000000000000000000000000000000000000001"))
///     .with_value(U256::from(1_000u64));
/// assert!(tx.data.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub to: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "decimal_u256_opt"
    )]
    pub value: Option<U256>,
}

impl Transaction {
    pub fn new(to: Address) -> Self {
        Self {
            to,
            data: None,
            value: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_transaction_wire_shape() {
        let tx = Transaction::new(address!("0x00000000000000000000000000000000000000aa"))
            .with_data(vec![0xde, 0xad])
            .with_value(U256::from(42u64));
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["data"], "0xdead");
        assert_eq!(json["value"], "42");
    }

    #[test]
    fn test_transaction_omits_empty_fields() {
        let tx = Transaction::new(Address::ZERO);
        let json = serde_json::to_value(&tx).unwrap();
        assert!(json.get("data").is_none());
        assert!(json.get("value").is_none());
    }
}
