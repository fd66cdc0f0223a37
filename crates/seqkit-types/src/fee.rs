//! Fee tokens, fee options and fee-option confirmations.
//!
//! A wallet backend that relays transactions quotes one [`FeeOption`] per token
//! it accepts as payment. Before a transaction is sent, somebody has to pick
//! one: the dispatch routine picks the first option the account can afford
//! ([`FirstAffordable`]), while the confirmation bridge shows the options,
//! annotated with balances ([`FeeOptionEntry`]), and lets the user pick.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::chain::ChainId;
use crate::util::{decimal_u256, format_units_or_default};

/// Kind of token a fee can be paid in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeeTokenType {
    Unknown,
    Erc20Token,
    Erc1155Token,
}

/// A token accepted for fee payment.
///
/// `contract_address == None` denotes the chain's native token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeToken {
    pub chain_id: ChainId,
    pub name: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub token_type: FeeTokenType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(default, rename = "logoURL")]
    pub logo_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    #[serde(default, rename = "tokenID", skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

impl FeeToken {
    pub fn is_native(&self) -> bool {
        self.contract_address.is_none()
    }
}

/// One way of paying the relay fee for a transaction batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeOption {
    pub token: FeeToken,
    /// Fee collector.
    pub to: Address,
    /// Amount owed, in the token's smallest unit.
    #[serde(with = "decimal_u256")]
    pub value: U256,
    #[serde(default)]
    pub gas_limit: u64,
}

/// The account's balance for a fee token, as shown next to a fee option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBalance {
    #[serde(with = "decimal_u256")]
    pub balance: U256,
    pub balance_formatted: String,
    pub has_enough_balance_for_fee: bool,
}

/// A fee option as published to the picker: annotated with the account's balance
/// unless balance checks were skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeOptionEntry {
    #[serde(flatten)]
    pub option: FeeOption,
    #[serde(flatten)]
    pub balance: Option<FeeBalance>,
}

impl FeeOptionEntry {
    pub fn unchecked(option: FeeOption) -> Self {
        Self {
            option,
            balance: None,
        }
    }

    /// Annotates `option` with `balance`; sufficiency is `balance >= value`.
    pub fn annotated(option: FeeOption, balance: U256) -> Self {
        let balance = FeeBalance {
            balance,
            balance_formatted: format_units_or_default(balance, option.token.decimals),
            has_enough_balance_for_fee: balance >= option.value,
        };
        Self {
            option,
            balance: Some(balance),
        }
    }

    /// `true` when balance checks were skipped or the balance covers the fee.
    pub fn is_viable(&self) -> bool {
        self.balance
            .as_ref()
            .is_none_or(|b| b.has_enough_balance_for_fee)
    }
}

/// The account's balances relevant to a set of fee options.
///
/// Token balances are keyed by contract and token id, so each ERC-1155 id of
/// a contract carries its own balance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeBalances {
    pub native: U256,
    pub tokens: HashMap<(Address, Option<String>), U256>,
}

impl FeeBalances {
    /// Balance for `token`; unknown token balances count as zero.
    pub fn balance_of(&self, token: &FeeToken) -> U256 {
        match token.contract_address {
            None => self.native,
            Some(contract) => self
                .tokens
                .get(&(contract, token.token_id.clone()))
                .copied()
                .unwrap_or_default(),
        }
    }

    pub fn can_afford(&self, option: &FeeOption) -> bool {
        self.balance_of(&option.token) >= option.value
    }

    /// Distinct ERC-20 contracts referenced by `options`, in first-seen order.
    pub fn token_contracts(options: &[FeeOption]) -> Vec<Address> {
        let mut contracts = Vec::new();
        for contract in options.iter().filter_map(|o| o.token.contract_address) {
            if !contracts.contains(&contract) {
                contracts.push(contract);
            }
        }
        contracts
    }

    /// Whether any option needs the native balance.
    pub fn needs_native(options: &[FeeOption]) -> bool {
        options.iter().any(|o| o.token.is_native())
    }
}

/// Strategy for choosing a fee option automatically.
pub trait FeeOptionSelector: Send + Sync {
    fn select<'a>(&self, options: &'a [FeeOption], balances: &FeeBalances)
    -> Option<&'a FeeOption>;
}

/// Default selector: the first option, in backend order, the account can fully afford.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAffordable;

impl FeeOptionSelector for FirstAffordable {
    fn select<'a>(
        &self,
        options: &'a [FeeOption],
        balances: &FeeBalances,
    ) -> Option<&'a FeeOption> {
        options.iter().find(|option| balances.can_afford(option))
    }
}

/// A fee-option choice waiting for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeOptionConfirmation {
    pub id: String,
    pub options: Vec<FeeOptionEntry>,
    pub chain_id: ChainId,
}

/// What the wallet provider receives once the user has decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeOptionConfirmationResult {
    pub id: String,
    /// `None` selects the native token (or nothing, when rejected).
    pub fee_token_address: Option<Address>,
    /// The chosen option, when the chosen token matched one of the offered options.
    pub fee_option: Option<FeeOption>,
    pub confirmed: bool,
}

impl FeeOptionConfirmationResult {
    pub fn rejected(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fee_token_address: None,
            fee_option: None,
            confirmed: false,
        }
    }
}
