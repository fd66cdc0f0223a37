//! Waiting for a transaction to reach a confirmation depth.
//!
//! The receipt comes from the indexer, which blocks until the transaction is
//! mined. Depth is then tracked against the chain head's block stream. Unlike
//! the indexer call, the head may stall indefinitely, so every wait carries a
//! [`CancellationToken`] and an optional timeout.

use alloy_primitives::B256;
use futures_util::StreamExt;
use seqkit_types::indexer::{Indexer, TransactionReceipt};
use seqkit_types::wallet::{ChainHead, WalletError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// How long, and how deep, to wait.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Blocks to wait past the receipt's block. Zero returns as soon as the
    /// receipt is known.
    pub confirmations: u64,
    pub timeout: Option<Duration>,
    pub cancellation: CancellationToken,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            confirmations: 1,
            timeout: None,
            cancellation: CancellationToken::new(),
        }
    }
}

impl WaitOptions {
    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("Failed to fetch transaction receipt: {0}")]
    Indexer(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Chain head error: {0}")]
    ChainHead(#[from] WalletError),
    #[error("Timed out after {0:?} waiting for transaction confirmation")]
    Timeout(Duration),
    #[error("Waiting for transaction confirmation was cancelled")]
    Cancelled,
    #[error("Block stream ended before the transaction was confirmed")]
    BlockStreamEnded,
}

/// Fetches the receipt of `tx_hash` and, if `options.confirmations > 0`,
/// waits until the chain head reaches `receipt.block_number + confirmations`.
///
/// A `FAILED` receipt is returned as is; judging it is up to the caller.
#[cfg_attr(feature = "telemetry", instrument(name = "wait_for_transaction_receipt", skip_all, err, fields(tx_hash = %tx_hash, confirmations = options.confirmations)))]
pub async fn wait_for_transaction_receipt<I: Indexer>(
    indexer: &I,
    chain_head: &dyn ChainHead,
    tx_hash: B256,
    options: &WaitOptions,
) -> Result<TransactionReceipt, WaitError> {
    let wait = wait_for_depth(indexer, chain_head, tx_hash, options.confirmations);
    let bounded = async {
        match options.timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .unwrap_or_else(|_| Err(WaitError::Timeout(limit))),
            None => wait.await,
        }
    };
    tokio::select! {
        biased;
        _ = options.cancellation.cancelled() => Err(WaitError::Cancelled),
        result = bounded => result,
    }
}

async fn wait_for_depth<I: Indexer>(
    indexer: &I,
    chain_head: &dyn ChainHead,
    tx_hash: B256,
    confirmations: u64,
) -> Result<TransactionReceipt, WaitError> {
    let receipt = indexer
        .fetch_transaction_receipt(tx_hash)
        .await
        .map_err(|e| WaitError::Indexer(Box::new(e)))?;
    if confirmations == 0 {
        return Ok(receipt);
    }
    let target = receipt.block_number.saturating_add(confirmations);
    let mut blocks = chain_head.watch_blocks().await?;
    while let Some(head) = blocks.next().await {
        let head = head?;
        #[cfg(feature = "telemetry")]
        tracing::trace!(head, target, "New head");
        if head >= target {
            return Ok(receipt);
        }
    }
    Err(WaitError::BlockStreamEnded)
}
