//! Sending a batch of transactions through whichever wallet is connected.
//!
//! [`send_transactions`] checks that both the wallet and the public client are
//! on the requested chain, then takes one of three paths:
//!
//! - embedded (WaaS) wallets get a fee quote, pick the first fee option the
//!   sender can afford and relay the whole batch;
//! - Sequence wallets take the whole batch in one call;
//! - EIP-1193 signers get one transaction at a time, each confirmed before the
//!   next is sent.
//!
//! The hash of the last transaction sent is returned.

use alloy_primitives::{Address, B256};
use seqkit_types::chain::ChainId;
use seqkit_types::fee::{FeeOption, FeeOptionSelector, FirstAffordable};
use seqkit_types::indexer::{Indexer, fee_balances};
use seqkit_types::transaction::Transaction;
use seqkit_types::wallet::{
    ChainHead, Eip1193Signer, SequenceWallet, WaasSendRequest, WaasSendResponse, WaasWallet,
    WalletError,
};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::connector::Connector;
use crate::receipt::{WaitError, WaitOptions, wait_for_transaction_receipt};

/// Which side reported an unexpected chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkSource {
    Wallet,
    PublicClient,
}

impl fmt::Display for NetworkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkSource::Wallet => write!(f, "Wallet"),
            NetworkSource::PublicClient => write!(f, "Public client"),
        }
    }
}

/// No quoted fee option is affordable. Carries every option that was quoted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FeeOptionInsufficientFundsError {
    pub message: String,
    pub fee_options: Vec<FeeOption>,
}

#[derive(Debug, thiserror::Error)]
pub enum SendTransactionsError {
    #[error("{client} is on {actual}, expected {expected}")]
    WrongNetwork {
        client: NetworkSource,
        expected: ChainId,
        actual: ChainId,
    },
    #[error("No transactions to send")]
    NoTransactions,
    #[error(transparent)]
    InsufficientFunds(#[from] FeeOptionInsufficientFundsError),
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("Failed to fetch fee balances: {0}")]
    Indexer(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    Wait(#[from] WaitError),
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Confirmation depth awaited after a transaction.
    pub transaction_confirmations: u64,
    /// Whether to wait on the last (or only) submission too.
    pub wait_confirmation_for_last_transaction: bool,
    /// Upper bound on each individual wait.
    pub confirmation_timeout: Option<Duration>,
    pub cancellation: CancellationToken,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            transaction_confirmations: 1,
            wait_confirmation_for_last_transaction: true,
            confirmation_timeout: None,
            cancellation: CancellationToken::new(),
        }
    }
}

impl DispatchOptions {
    fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            confirmations: self.transaction_confirmations,
            timeout: self.confirmation_timeout,
            cancellation: self.cancellation.clone(),
        }
    }
}

pub struct SendTransactionsParams<'a, I> {
    pub chain_id: ChainId,
    pub sender_address: Address,
    pub transactions: Vec<Transaction>,
    pub connector: &'a Connector,
    /// Read access to the chain, used for confirmation depth.
    pub public_client: &'a dyn ChainHead,
    pub indexer: &'a I,
    pub options: DispatchOptions,
}

/// Sends `params.transactions` and returns the hash of the last one sent.
///
/// Nothing is sent if the wallet or the public client is on another chain.
#[cfg_attr(feature = "telemetry", instrument(name = "send_transactions", skip_all, err, fields(chain = %params.chain_id, connector = %params.connector.kind(), transactions = params.transactions.len())))]
pub async fn send_transactions<I: Indexer>(
    params: SendTransactionsParams<'_, I>,
) -> Result<B256, SendTransactionsError> {
    let SendTransactionsParams {
        chain_id,
        sender_address,
        transactions,
        connector,
        public_client,
        indexer,
        options,
    } = params;

    if transactions.is_empty() {
        return Err(SendTransactionsError::NoTransactions);
    }
    let wallet_chain = connector.chain_id().await?;
    if wallet_chain != chain_id {
        return Err(SendTransactionsError::WrongNetwork {
            client: NetworkSource::Wallet,
            expected: chain_id,
            actual: wallet_chain,
        });
    }
    let public_chain = public_client.chain_id().await?;
    if public_chain != chain_id {
        return Err(SendTransactionsError::WrongNetwork {
            client: NetworkSource::PublicClient,
            expected: chain_id,
            actual: public_chain,
        });
    }

    let dispatch = Dispatch {
        chain_id,
        sender_address,
        public_client,
        indexer,
        options: &options,
    };
    match connector {
        Connector::Waas(wallet) => dispatch.via_waas(wallet.as_ref(), transactions).await,
        Connector::Sequence(wallet) => dispatch.via_sequence(wallet.as_ref(), &transactions).await,
        Connector::Eip1193(signer) => dispatch.via_eip1193(signer.as_ref(), &transactions).await,
    }
}

struct Dispatch<'a, I> {
    chain_id: ChainId,
    sender_address: Address,
    public_client: &'a dyn ChainHead,
    indexer: &'a I,
    options: &'a DispatchOptions,
}

impl<I: Indexer> Dispatch<'_, I> {
    async fn via_waas(
        &self,
        wallet: &dyn WaasWallet,
        transactions: Vec<Transaction>,
    ) -> Result<B256, SendTransactionsError> {
        let quote = wallet.fee_options(&transactions, self.chain_id).await?;
        let fee_option = if quote.fee_options.is_empty() {
            #[cfg(feature = "telemetry")]
            tracing::debug!("Sponsored batch");
            None
        } else {
            Some(self.select_fee_option(quote.fee_options).await?)
        };
        let request = WaasSendRequest {
            transactions,
            transactions_fee_option: fee_option,
            transactions_fee_quote: quote.fee_quote,
            network: self.chain_id,
        };
        match wallet.send_transaction(request).await? {
            WaasSendResponse::TransactionFailed { error } => {
                Err(SendTransactionsError::TransactionFailed(error))
            }
            WaasSendResponse::TransactionReceipt { tx_hash } => {
                if self.options.wait_confirmation_for_last_transaction {
                    self.confirm(tx_hash).await?;
                }
                Ok(tx_hash)
            }
        }
    }

    async fn select_fee_option(
        &self,
        fee_options: Vec<FeeOption>,
    ) -> Result<FeeOption, SendTransactionsError> {
        let balances = fee_balances(self.indexer, self.sender_address, &fee_options)
            .await
            .map_err(|e| SendTransactionsError::Indexer(Box::new(e)))?;
        match FirstAffordable.select(&fee_options, &balances) {
            Some(option) => {
                #[cfg(feature = "telemetry")]
                tracing::debug!(token = %option.token.symbol, value = %option.value, "Selected fee option");
                Ok(option.clone())
            }
            None => Err(FeeOptionInsufficientFundsError {
                message: format!(
                    "Insufficient balance to pay for any of {} fee options",
                    fee_options.len()
                ),
                fee_options,
            }
            .into()),
        }
    }

    async fn via_sequence(
        &self,
        wallet: &dyn SequenceWallet,
        transactions: &[Transaction],
    ) -> Result<B256, SendTransactionsError> {
        let tx_hash = wallet.send_transactions(transactions, self.chain_id).await?;
        if self.options.wait_confirmation_for_last_transaction {
            self.confirm(tx_hash).await?;
        }
        Ok(tx_hash)
    }

    async fn via_eip1193(
        &self,
        signer: &dyn Eip1193Signer,
        transactions: &[Transaction],
    ) -> Result<B256, SendTransactionsError> {
        let mut last = None;
        for (index, transaction) in transactions.iter().enumerate() {
            let tx_hash = signer
                .send_transaction(self.sender_address, transaction)
                .await?;
            let is_last = index + 1 == transactions.len();
            if !is_last || self.options.wait_confirmation_for_last_transaction {
                self.confirm(tx_hash).await?;
            }
            last = Some(tx_hash);
        }
        last.ok_or(SendTransactionsError::NoTransactions)
    }

    async fn confirm(&self, tx_hash: B256) -> Result<(), SendTransactionsError> {
        let receipt = wait_for_transaction_receipt(
            self.indexer,
            self.public_client,
            tx_hash,
            &self.options.wait_options(),
        )
        .await?;
        if receipt.is_failed() {
            let reason = receipt
                .reason
                .unwrap_or_else(|| format!("transaction {tx_hash} reverted"));
            return Err(SendTransactionsError::TransactionFailed(reason));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use std::sync::Arc;

    fn params<'a>(
        connector: &'a Connector,
        head: &'a FakeChainHead,
        indexer: &'a FakeIndexer,
        transactions: Vec<Transaction>,
    ) -> SendTransactionsParams<'a, FakeIndexer> {
        SendTransactionsParams {
            chain_id: POLYGON,
            sender_address: ACCOUNT,
            transactions,
            connector,
            public_client: head,
            indexer,
            options: DispatchOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_waas_picks_first_affordable_option() {
        let indexer = FakeIndexer::with_balances(5, &[(USDC, 150), (DAI, 1_000)]);
        let options = vec![
            fee_option(None, 10),
            fee_option(Some(USDC), 100),
            fee_option(Some(DAI), 1),
        ];
        let wallet = Arc::new(FakeWaas::new(POLYGON, options.clone()));
        let connector = Connector::Waas(wallet.clone());
        let head = FakeChainHead::at(POLYGON, 100);

        let hash = send_transactions(params(&connector, &head, &indexer, vec![call(1), call(2)]))
            .await
            .unwrap();
        assert_eq!(hash, hash_of(&call(2)));

        let sent = wallet.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].transactions.len(), 2);
        assert_eq!(sent[0].transactions_fee_option, Some(options[1].clone()));
        assert_eq!(sent[0].transactions_fee_quote.as_deref(), Some("quote-1"));
        assert_eq!(sent[0].network, POLYGON);
    }

    #[tokio::test]
    async fn test_waas_sponsored_skips_balances() {
        let indexer = FakeIndexer::with_balances(0, &[]);
        let wallet = Arc::new(FakeWaas::new(POLYGON, vec![]));
        let connector = Connector::Waas(wallet.clone());
        let head = FakeChainHead::at(POLYGON, 100);

        send_transactions(params(&connector, &head, &indexer, vec![call(1)]))
            .await
            .unwrap();
        assert_eq!(wallet.sent.lock().unwrap()[0].transactions_fee_option, None);
        assert!(!indexer.log.events().iter().any(|e| e.starts_with("balance")));
    }

    #[tokio::test]
    async fn test_waas_insufficient_funds_carries_all_options() {
        let indexer = FakeIndexer::with_balances(1, &[(USDC, 2)]);
        let options = vec![fee_option(None, 10), fee_option(Some(USDC), 100)];
        let wallet = Arc::new(FakeWaas::new(POLYGON, options.clone()));
        let connector = Connector::Waas(wallet.clone());
        let head = FakeChainHead::at(POLYGON, 100);

        let err = send_transactions(params(&connector, &head, &indexer, vec![call(1)]))
            .await
            .unwrap_err();
        match err {
            SendTransactionsError::InsufficientFunds(e) => assert_eq!(e.fee_options, options),
            other => panic!("unexpected error: {other}"),
        }
        assert!(wallet.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_waas_failed_response() {
        let indexer = FakeIndexer::with_balances(0, &[]);
        let mut wallet = FakeWaas::new(POLYGON, vec![]);
        wallet.response = Some(WaasSendResponse::TransactionFailed {
            error: "execution reverted".into(),
        });
        let connector = Connector::Waas(Arc::new(wallet));
        let head = FakeChainHead::at(POLYGON, 100);

        let err = send_transactions(params(&connector, &head, &indexer, vec![call(1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, SendTransactionsError::TransactionFailed(m) if m == "execution reverted"));
    }

    #[tokio::test]
    async fn test_waas_failed_receipt() {
        let mut indexer = FakeIndexer::with_balances(0, &[]);
        indexer.failed.push(hash_of(&call(2)));
        let wallet = Arc::new(FakeWaas::new(POLYGON, vec![]));
        let connector = Connector::Waas(wallet.clone());
        let head = FakeChainHead::at(POLYGON, 100);

        let err = send_transactions(params(&connector, &head, &indexer, vec![call(1), call(2)]))
            .await
            .unwrap_err();
        assert!(matches!(err, SendTransactionsError::TransactionFailed(_)));
        assert_eq!(wallet.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sequence_sends_one_batch() {
        let indexer = FakeIndexer::with_balances(0, &[]);
        let log = indexer.log.clone();
        let connector = Connector::Sequence(Arc::new(FakeSequence {
            chain_id: POLYGON,
            log: log.clone(),
        }));
        let head = FakeChainHead::at(POLYGON, 100);
        let transactions = vec![call(1), call(2), call(3)];

        let hash = send_transactions(params(&connector, &head, &indexer, transactions))
            .await
            .unwrap();
        assert_eq!(hash, hash_of(&call(3)));
        assert_eq!(
            log.events(),
            vec!["send batch 3".to_owned(), format!("receipt {hash}")]
        );
    }

    #[tokio::test]
    async fn test_sequence_failed_receipt() {
        let mut indexer = FakeIndexer::with_balances(0, &[]);
        indexer.failed.push(hash_of(&call(3)));
        let log = indexer.log.clone();
        let connector = Connector::Sequence(Arc::new(FakeSequence {
            chain_id: POLYGON,
            log: log.clone(),
        }));
        let head = FakeChainHead::at(POLYGON, 100);

        let err = send_transactions(params(&connector, &head, &indexer, vec![call(1), call(2), call(3)]))
            .await
            .unwrap_err();
        assert!(matches!(err, SendTransactionsError::TransactionFailed(_)));
        assert_eq!(log.events()[0], "send batch 3");
    }

    #[tokio::test]
    async fn test_eip1193_waits_between_sends_in_order() {
        let indexer = FakeIndexer::with_balances(0, &[]);
        let log = indexer.log.clone();
        let connector = Connector::Eip1193(Arc::new(FakeSigner {
            chain_id: POLYGON,
            log: log.clone(),
        }));
        let head = FakeChainHead::at(POLYGON, 100);
        let (a, b, c) = (call(0xa), call(0xb), call(0xc));

        let hash = send_transactions(params(&connector, &head, &indexer, vec![a.clone(), b.clone(), c.clone()]))
            .await
            .unwrap();
        assert_eq!(hash, hash_of(&c));

        let expected: Vec<String> = [&a, &b, &c]
            .into_iter()
            .flat_map(|tx| {
                let hash = hash_of(tx);
                [format!("send {hash}"), format!("receipt {hash}")]
            })
            .collect();
        assert_eq!(log.events(), expected);
    }

    #[tokio::test]
    async fn test_eip1193_skips_last_wait_when_disabled() {
        let indexer = FakeIndexer::with_balances(0, &[]);
        let log = indexer.log.clone();
        let connector = Connector::Eip1193(Arc::new(FakeSigner {
            chain_id: POLYGON,
            log: log.clone(),
        }));
        let head = FakeChainHead::at(POLYGON, 100);
        let mut params = params(&connector, &head, &indexer, vec![call(1), call(2)]);
        params.options.wait_confirmation_for_last_transaction = false;

        send_transactions(params).await.unwrap();
        let events = log.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], format!("send {}", hash_of(&call(2))));
    }

    #[tokio::test]
    async fn test_eip1193_failed_receipt_aborts() {
        let mut indexer = FakeIndexer::with_balances(0, &[]);
        indexer.failed.push(hash_of(&call(2)));
        let log = indexer.log.clone();
        let connector = Connector::Eip1193(Arc::new(FakeSigner {
            chain_id: POLYGON,
            log: log.clone(),
        }));
        let head = FakeChainHead::at(POLYGON, 100);

        let err = send_transactions(params(&connector, &head, &indexer, vec![call(1), call(2), call(3)]))
            .await
            .unwrap_err();
        assert!(matches!(err, SendTransactionsError::TransactionFailed(_)));
        let sent_third = format!("send {}", hash_of(&call(3)));
        assert!(!log.events().contains(&sent_third));
    }

    #[tokio::test]
    async fn test_wrong_network_rejects_before_send() {
        let indexer = FakeIndexer::with_balances(0, &[]);
        let log = indexer.log.clone();
        let head = FakeChainHead::at(POLYGON, 100);

        let on_mainnet = Connector::Eip1193(Arc::new(FakeSigner {
            chain_id: ChainId::new(1),
            log: log.clone(),
        }));
        let err = send_transactions(params(&on_mainnet, &head, &indexer, vec![call(1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SendTransactionsError::WrongNetwork { client: NetworkSource::Wallet, actual, .. } if actual == ChainId::new(1)
        ));

        let connector = Connector::Eip1193(Arc::new(FakeSigner {
            chain_id: POLYGON,
            log: log.clone(),
        }));
        let stale_head = FakeChainHead::at(ChainId::new(10), 100);
        let err = send_transactions(params(&connector, &stale_head, &indexer, vec![call(1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SendTransactionsError::WrongNetwork { client: NetworkSource::PublicClient, .. }
        ));
        assert!(log.events().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let indexer = FakeIndexer::with_balances(0, &[]);
        let connector = Connector::Sequence(Arc::new(FakeSequence {
            chain_id: POLYGON,
            log: indexer.log.clone(),
        }));
        let head = FakeChainHead::at(POLYGON, 100);
        let err = send_transactions(params(&connector, &head, &indexer, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, SendTransactionsError::NoTransactions));
    }
}
