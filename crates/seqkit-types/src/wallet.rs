//! Wallet traits and confirmation handlers.
//!
//! A connected wallet is one of three kinds, each with its own submission
//! surface:
//!
//! - [`WaasWallet`] - an embedded wallet that relays transactions and charges a
//!   fee in a token of the user's choice;
//! - [`SequenceWallet`] - a smart-contract wallet that accepts a whole batch in
//!   one call;
//! - [`Eip1193Signer`] - any other injected signer, one transaction at a time.
//!
//! The traits are object-safe so that a connector can hold the wallet as
//! `Arc<dyn ...>` once the kind is known.
//!
//! Wallet providers call back into the application through
//! [`FeeConfirmationHandler`] and [`RequestConfirmationHandler`] when a user
//! decision is needed.

use alloy_primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::chain::ChainId;
use crate::fee::{FeeOption, FeeOptionConfirmationResult};
use crate::transaction::Transaction;

/// Errors surfaced by wallet backends and the chain head.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The backend answered but refused the operation.
    #[error("Wallet backend error: {0}")]
    Backend(String),
    /// The operation is not available on this wallet.
    #[error("Unsupported wallet operation: {0}")]
    Unsupported(&'static str),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl WalletError {
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(error))
    }
}

/// Fee quote for a batch on an embedded wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaasFeeOptions {
    /// Empty when the batch is sponsored.
    pub fee_options: Vec<FeeOption>,
    /// Opaque quote to hand back on submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_quote: Option<String>,
}

/// A batch submission on an embedded wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaasSendRequest {
    pub transactions: Vec<Transaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions_fee_option: Option<FeeOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions_fee_quote: Option<String>,
    pub network: ChainId,
}

/// Outcome of an embedded-wallet submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "data", rename_all = "camelCase")]
pub enum WaasSendResponse {
    TransactionReceipt {
        #[serde(rename = "txHash")]
        tx_hash: B256,
    },
    TransactionFailed {
        error: String,
    },
}

/// Embedded (WaaS) wallet.
#[async_trait]
pub trait WaasWallet: Send + Sync {
    async fn chain_id(&self) -> Result<ChainId, WalletError>;

    /// Fee options for `transactions` on `chain_id`.
    async fn fee_options(
        &self,
        transactions: &[Transaction],
        chain_id: ChainId,
    ) -> Result<WaasFeeOptions, WalletError>;

    async fn send_transaction(
        &self,
        request: WaasSendRequest,
    ) -> Result<WaasSendResponse, WalletError>;
}

/// Sequence-native smart-contract wallet.
#[async_trait]
pub trait SequenceWallet: Send + Sync {
    async fn chain_id(&self) -> Result<ChainId, WalletError>;

    /// Submits the batch as one meta-transaction; returns its hash.
    async fn send_transactions(
        &self,
        transactions: &[Transaction],
        chain_id: ChainId,
    ) -> Result<B256, WalletError>;
}

/// Generic EIP-1193 signer.
#[async_trait]
pub trait Eip1193Signer: Send + Sync {
    async fn chain_id(&self) -> Result<ChainId, WalletError>;

    /// `eth_sendTransaction` of a single call from `from`.
    async fn send_transaction(
        &self,
        from: Address,
        transaction: &Transaction,
    ) -> Result<B256, WalletError>;
}

/// Read access to the chain itself: its id and its head.
#[async_trait]
pub trait ChainHead: Send + Sync {
    async fn chain_id(&self) -> Result<ChainId, WalletError>;

    async fn block_number(&self) -> Result<u64, WalletError>;

    /// Stream of new head block numbers, starting from the current head.
    async fn watch_blocks(&self) -> Result<BoxStream<'static, Result<u64, WalletError>>, WalletError>;
}

/// Called by a wallet provider when a batch needs a fee token chosen.
#[async_trait]
pub trait FeeConfirmationHandler: Send + Sync {
    async fn confirm_fee_option(
        &self,
        id: String,
        options: Vec<FeeOption>,
        transactions: Vec<Transaction>,
        chain_id: ChainId,
    ) -> Result<FeeOptionConfirmationResult, WalletError>;
}

/// What a sign request asks the user to approve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RequestConfirmationKind {
    SignTransaction { transactions: Vec<Transaction> },
    SignMessage { message: Bytes },
}

/// A sign request waiting for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequestConfirmation {
    pub id: String,
    #[serde(flatten)]
    pub kind: RequestConfirmationKind,
    pub chain_id: ChainId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfirmationResult {
    pub id: String,
    pub confirmed: bool,
}

/// Called by a wallet provider before it signs on the user's behalf.
#[async_trait]
pub trait RequestConfirmationHandler: Send + Sync {
    async fn confirm_sign_transaction_request(
        &self,
        id: String,
        transactions: Vec<Transaction>,
        chain_id: ChainId,
    ) -> Result<RequestConfirmationResult, WalletError>;

    async fn confirm_sign_message_request(
        &self,
        id: String,
        message: Bytes,
        chain_id: ChainId,
    ) -> Result<RequestConfirmationResult, WalletError>;
}
