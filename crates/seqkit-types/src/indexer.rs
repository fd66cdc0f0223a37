//! The indexer abstraction: balances and transaction receipts without a node.
//!
//! The indexer is an external HTTP service. This module fixes the subset of its
//! surface the SDK needs as the [`Indexer`] trait, plus the wire types it
//! returns. `seqkit-indexer` ships the reqwest implementation.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use crate::chain::ChainId;
use crate::fee::{FeeBalances, FeeOption};
use crate::util::decimal_u256;

/// Token standard of a balance entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContractType {
    Unknown,
    Native,
    Erc20,
    Erc721,
    Erc1155,
    #[serde(other)]
    Other,
}

/// Token metadata attached to balance entries when requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimals: Option<u8>,
}

/// One token balance of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub contract_type: ContractType,
    pub contract_address: Address,
    pub account_address: Address,
    #[serde(default, rename = "tokenID", skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(with = "decimal_u256")]
    pub balance: U256,
    #[serde(default)]
    pub block_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ChainId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_info: Option<ContractInfo>,
}

/// On-chain outcome of a transaction as reported by the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Unknown,
    Failed,
    Successful,
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub txn_hash: B256,
    pub txn_status: TransactionStatus,
    pub block_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TransactionReceipt {
    pub fn is_failed(&self) -> bool {
        self.txn_status == TransactionStatus::Failed
    }
}

/// Read access to the indexer.
pub trait Indexer: Send + Sync {
    /// Error type for indexer operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Native token balance of `account`.
    fn native_token_balance(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<U256, Self::Error>> + Send;

    /// ERC-20 balances of `account` for the given contracts.
    ///
    /// Contracts the account holds nothing of may be absent from the result.
    fn token_balances(
        &self,
        account: Address,
        contracts: &[Address],
    ) -> impl Future<Output = Result<Vec<TokenBalance>, Self::Error>> + Send;

    /// Receipt of `txn_hash`, waiting on the indexer side until it is mined.
    fn fetch_transaction_receipt(
        &self,
        txn_hash: B256,
    ) -> impl Future<Output = Result<TransactionReceipt, Self::Error>> + Send;
}

impl<T: Indexer> Indexer for Arc<T> {
    type Error = T::Error;

    fn native_token_balance(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<U256, Self::Error>> + Send {
        (**self).native_token_balance(account)
    }

    fn token_balances(
        &self,
        account: Address,
        contracts: &[Address],
    ) -> impl Future<Output = Result<Vec<TokenBalance>, Self::Error>> + Send {
        (**self).token_balances(account, contracts)
    }

    fn fetch_transaction_receipt(
        &self,
        txn_hash: B256,
    ) -> impl Future<Output = Result<TransactionReceipt, Self::Error>> + Send {
        (**self).fetch_transaction_receipt(txn_hash)
    }
}

/// Fetches the balances needed to judge `options`: the native balance if any
/// option is native, and one batched token lookup for the rest.
pub async fn fee_balances<I: Indexer>(
    indexer: &I,
    account: Address,
    options: &[FeeOption],
) -> Result<FeeBalances, I::Error> {
    let native = if FeeBalances::needs_native(options) {
        indexer.native_token_balance(account).await?
    } else {
        U256::ZERO
    };
    let contracts = FeeBalances::token_contracts(options);
    let tokens = if contracts.is_empty() {
        Default::default()
    } else {
        indexer
            .token_balances(account, &contracts)
            .await?
            .into_iter()
            .map(|b| ((b.contract_address, b.token_id), b.balance))
            .collect()
    };
    Ok(FeeBalances { native, tokens })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::tests::{USDC, fee_option};
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingIndexer {
        native_calls: AtomicUsize,
        token_calls: AtomicUsize,
    }

    impl Indexer for CountingIndexer {
        type Error = Infallible;

        async fn native_token_balance(&self, _account: Address) -> Result<U256, Infallible> {
            self.native_calls.fetch_add(1, Ordering::SeqCst);
            Ok(U256::from(7u64))
        }

        async fn token_balances(
            &self,
            account: Address,
            contracts: &[Address],
        ) -> Result<Vec<TokenBalance>, Infallible> {
            self.token_calls.fetch_add(1, Ordering::SeqCst);
            Ok(contracts
                .iter()
                .map(|contract| TokenBalance {
                    contract_type: ContractType::Erc20,
                    contract_address: *contract,
                    account_address: account,
                    token_id: None,
                    balance: U256::from(99u64),
                    block_number: 1,
                    chain_id: None,
                    contract_info: None,
                })
                .collect())
        }

        async fn fetch_transaction_receipt(
            &self,
            txn_hash: B256,
        ) -> Result<TransactionReceipt, Infallible> {
            Ok(TransactionReceipt {
                txn_hash,
                txn_status: TransactionStatus::Successful,
                block_number: 1,
                block_hash: None,
                is_final: true,
                reason: None,
            })
        }
    }

    #[tokio::test]
    async fn test_fee_balances_batches_token_lookup() {
        let indexer = CountingIndexer::default();
        let options = vec![
            fee_option(None, 1),
            fee_option(Some(USDC), 1),
            fee_option(Some(USDC), 2),
        ];
        let balances = fee_balances(&indexer, Address::ZERO, &options).await.unwrap();
        assert_eq!(balances.native, U256::from(7u64));
        assert_eq!(balances.tokens[&(USDC, None)], U256::from(99u64));
        assert_eq!(indexer.native_calls.load(Ordering::SeqCst), 1);
        assert_eq!(indexer.token_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fee_balances_skips_unneeded_lookups() {
        let indexer = CountingIndexer::default();
        let options = vec![fee_option(Some(USDC), 1)];
        let balances = fee_balances(&indexer, Address::ZERO, &options).await.unwrap();
        assert_eq!(balances.native, U256::ZERO);
        assert_eq!(indexer.native_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_receipt_wire_shape() {
        let json = serde_json::json!({
            "txnHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "txnStatus": "FAILED",
            "blockNumber": 123,
            "final": true,
            "reason": "execution reverted"
        });
        let receipt: TransactionReceipt = serde_json::from_value(json).unwrap();
        assert!(receipt.is_failed());
        assert_eq!(receipt.block_number, 123);
    }

    #[test]
    fn test_unknown_contract_type_tolerated() {
        let ct: ContractType = serde_json::from_str("\"SEQUENCE_WALLET\"").unwrap();
        assert_eq!(ct, ContractType::Other);
    }
}
