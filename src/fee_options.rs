//! Fee-option confirmation: suspend a wallet provider until the user picks a fee token.
//!
//! When an embedded wallet needs a fee token chosen, it calls
//! [`FeeOptionBridge::confirm_fee_option`] (directly or through
//! [`FeeConfirmationHandler`]). The bridge annotates the options with the
//! account's balances, publishes them to its [`ConfirmationStore`], and
//! suspends until a view calls [`FeeOptionBridge::confirm`] or
//! [`FeeOptionBridge::reject`].
//!
//! ```no_run
//! # async fn run(bridge: std::sync::Arc<seqkit::fee_options::FeeOptionBridge<seqkit_indexer::IndexerClient>>) {
//! let mut pending = bridge.subscribe();
//! while pending.changed().await.is_ok() {
//!     let confirmation = pending.borrow_and_update().clone();
//!     if let Some(confirmation) = confirmation {
//!         // Pick the first option the account can pay for.
//!         let choice = confirmation.options.iter().find(|o| o.is_viable());
//!         match choice {
//!             Some(entry) => bridge.confirm(&confirmation.id, entry.option.token.contract_address),
//!             None => bridge.reject(&confirmation.id),
//!         };
//!     }
//! }
//! # }
//! ```

use alloy_primitives::Address;
use async_trait::async_trait;
use seqkit_types::chain::ChainId;
use seqkit_types::deferred::DeferredDropped;
use seqkit_types::fee::{
    FeeOption, FeeOptionConfirmation, FeeOptionConfirmationResult, FeeOptionEntry,
};
use seqkit_types::indexer::{Indexer, fee_balances};
use seqkit_types::store::ConfirmationStore;
use seqkit_types::transaction::Transaction;
use seqkit_types::wallet::{FeeConfirmationHandler, WalletError};
use std::sync::Arc;
use tokio::sync::watch;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::slot::{DecisionSlot, Identified};

#[derive(Debug, thiserror::Error)]
pub enum FeeOptionError {
    #[error("Fee option confirmation {pending_id} is already pending")]
    ConfirmationPending { pending_id: String },
    #[error("No fee options with user balance available")]
    NoViableOptions,
    #[error("Failed to fetch fee balances: {0}")]
    Indexer(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Fee option confirmation abandoned: {0}")]
    Abandoned(#[from] DeferredDropped),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeOptionBridgeConfig {
    /// Publish options without balances and let the user pick any of them.
    pub skip_fee_balance_check: bool,
}

/// The user's answer to a published [`FeeOptionConfirmation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeOptionDecision {
    /// `None` picks the native token.
    Confirmed(Option<Address>),
    Rejected,
}

impl Identified for FeeOptionConfirmation {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Connects a wallet provider's fee-option callback to whichever view shows the picker.
pub struct FeeOptionBridge<I> {
    account: Address,
    indexer: I,
    config: FeeOptionBridgeConfig,
    slot: DecisionSlot<FeeOptionConfirmation, FeeOptionDecision>,
}

impl<I> std::fmt::Debug for FeeOptionBridge<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeeOptionBridge")
            .field("account", &self.account)
            .field("config", &self.config)
            .field("pending", &self.slot.current().map(|c| c.id))
            .finish_non_exhaustive()
    }
}

impl<I: Indexer> FeeOptionBridge<I> {
    pub fn new(account: Address, indexer: I, config: FeeOptionBridgeConfig) -> Self {
        Self::with_store(account, indexer, config, Arc::new(ConfirmationStore::new()))
    }

    /// Publishes into `store`, which other components may observe too.
    pub fn with_store(
        account: Address,
        indexer: I,
        config: FeeOptionBridgeConfig,
        store: Arc<ConfirmationStore<FeeOptionConfirmation>>,
    ) -> Self {
        Self {
            account,
            indexer,
            config,
            slot: DecisionSlot::new(store),
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn store(&self) -> &Arc<ConfirmationStore<FeeOptionConfirmation>> {
        self.slot.store()
    }

    /// The confirmation currently waiting for the user, if any.
    pub fn pending(&self) -> Option<FeeOptionConfirmation> {
        self.slot.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<FeeOptionConfirmation>> {
        self.slot.subscribe()
    }

    /// Confirms pending confirmation `id` with the given fee token.
    ///
    /// Returns `false` if `id` is not the pending confirmation or was already answered.
    pub fn confirm(&self, id: &str, fee_token_address: Option<Address>) -> bool {
        self.slot
            .resolve(id, FeeOptionDecision::Confirmed(fee_token_address))
    }

    /// Rejects pending confirmation `id`. Same return value as [`Self::confirm`].
    pub fn reject(&self, id: &str) -> bool {
        self.slot.resolve(id, FeeOptionDecision::Rejected)
    }

    /// Publishes `options` for the user and waits for the decision.
    ///
    /// Fails without publishing if another confirmation is pending or if the
    /// account cannot afford any option. Dropping the returned future clears
    /// the published state.
    #[allow(unused_variables)] // transactions are recorded in the span only
    #[cfg_attr(feature = "telemetry", instrument(name = "fee_options.confirm", skip_all, err, fields(id = %id, chain = %chain_id, options = options.len(), transactions = transactions.len())))]
    pub async fn confirm_fee_option(
        &self,
        id: String,
        options: Vec<FeeOption>,
        transactions: &[Transaction],
        chain_id: ChainId,
    ) -> Result<FeeOptionConfirmationResult, FeeOptionError> {
        let (reservation, pending) = self
            .slot
            .reserve(&id)
            .map_err(|pending_id| FeeOptionError::ConfirmationPending { pending_id })?;

        let entries = self.annotate(&options).await?;
        if !entries.iter().any(FeeOptionEntry::is_viable) {
            return Err(FeeOptionError::NoViableOptions);
        }

        reservation
            .publish(FeeOptionConfirmation {
                id: id.clone(),
                options: entries,
                chain_id,
            })
            .map_err(|pending_id| FeeOptionError::ConfirmationPending { pending_id })?;
        let decision = pending.await?;
        drop(reservation);

        #[cfg(feature = "telemetry")]
        tracing::debug!(?decision, "Fee option decided");

        let result = match decision {
            FeeOptionDecision::Confirmed(fee_token_address) => FeeOptionConfirmationResult {
                fee_option: options
                    .into_iter()
                    .find(|o| o.token.contract_address == fee_token_address),
                id,
                fee_token_address,
                confirmed: true,
            },
            FeeOptionDecision::Rejected => FeeOptionConfirmationResult::rejected(id),
        };
        Ok(result)
    }

    async fn annotate(&self, options: &[FeeOption]) -> Result<Vec<FeeOptionEntry>, FeeOptionError> {
        if self.config.skip_fee_balance_check {
            return Ok(options.iter().cloned().map(FeeOptionEntry::unchecked).collect());
        }
        let balances = fee_balances(&self.indexer, self.account, options)
            .await
            .map_err(|e| FeeOptionError::Indexer(Box::new(e)))?;
        let entries = options
            .iter()
            .cloned()
            .map(|option| {
                let balance = balances.balance_of(&option.token);
                FeeOptionEntry::annotated(option, balance)
            })
            .collect();
        Ok(entries)
    }
}

#[async_trait]
impl<I: Indexer> FeeConfirmationHandler for FeeOptionBridge<I> {
    async fn confirm_fee_option(
        &self,
        id: String,
        options: Vec<FeeOption>,
        transactions: Vec<Transaction>,
        chain_id: ChainId,
    ) -> Result<FeeOptionConfirmationResult, WalletError> {
        FeeOptionBridge::confirm_fee_option(self, id, options, &transactions, chain_id)
            .await
            .map_err(WalletError::other)
    }
}
