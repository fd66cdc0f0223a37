//! Approval of raw sign requests before a wallet signs on the user's behalf.
//!
//! Same handshake as [`crate::fee_options`]: the request is published, a view
//! answers with [`RequestConfirmationBridge::confirm`] or
//! [`RequestConfirmationBridge::reject`], and the wallet provider resumes.

use alloy_primitives::Bytes;
use async_trait::async_trait;
use seqkit_types::chain::ChainId;
use seqkit_types::deferred::DeferredDropped;
use seqkit_types::store::ConfirmationStore;
use seqkit_types::transaction::Transaction;
use seqkit_types::wallet::{
    PendingRequestConfirmation, RequestConfirmationHandler, RequestConfirmationKind,
    RequestConfirmationResult, WalletError,
};
use std::sync::Arc;
use tokio::sync::watch;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::slot::{DecisionSlot, Identified};

#[derive(Debug, thiserror::Error)]
pub enum RequestConfirmationError {
    #[error("Sign request {pending_id} is already pending")]
    ConfirmationPending { pending_id: String },
    #[error("Sign request abandoned: {0}")]
    Abandoned(#[from] DeferredDropped),
}

impl Identified for PendingRequestConfirmation {
    fn id(&self) -> &str {
        &self.id
    }
}

pub struct RequestConfirmationBridge {
    slot: DecisionSlot<PendingRequestConfirmation, bool>,
}

impl std::fmt::Debug for RequestConfirmationBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestConfirmationBridge")
            .field("pending", &self.slot.current().map(|c| c.id))
            .finish()
    }
}

impl Default for RequestConfirmationBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestConfirmationBridge {
    pub fn new() -> Self {
        Self::with_store(Arc::new(ConfirmationStore::new()))
    }

    pub fn with_store(store: Arc<ConfirmationStore<PendingRequestConfirmation>>) -> Self {
        Self {
            slot: DecisionSlot::new(store),
        }
    }

    pub fn store(&self) -> &Arc<ConfirmationStore<PendingRequestConfirmation>> {
        self.slot.store()
    }

    pub fn pending(&self) -> Option<PendingRequestConfirmation> {
        self.slot.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PendingRequestConfirmation>> {
        self.slot.subscribe()
    }

    pub fn confirm(&self, id: &str) -> bool {
        self.slot.resolve(id, true)
    }

    pub fn reject(&self, id: &str) -> bool {
        self.slot.resolve(id, false)
    }

    pub async fn confirm_sign_transaction_request(
        &self,
        id: String,
        transactions: Vec<Transaction>,
        chain_id: ChainId,
    ) -> Result<RequestConfirmationResult, RequestConfirmationError> {
        let kind = RequestConfirmationKind::SignTransaction { transactions };
        self.request(id, kind, chain_id).await
    }

    pub async fn confirm_sign_message_request(
        &self,
        id: String,
        message: Bytes,
        chain_id: ChainId,
    ) -> Result<RequestConfirmationResult, RequestConfirmationError> {
        let kind = RequestConfirmationKind::SignMessage { message };
        self.request(id, kind, chain_id).await
    }

    #[cfg_attr(feature = "telemetry", instrument(name = "sign_request.confirm", skip_all, err, fields(id = %id, chain = %chain_id)))]
    async fn request(
        &self,
        id: String,
        kind: RequestConfirmationKind,
        chain_id: ChainId,
    ) -> Result<RequestConfirmationResult, RequestConfirmationError> {
        let pending_error =
            |pending_id| RequestConfirmationError::ConfirmationPending { pending_id };
        let (reservation, pending) = self.slot.reserve(&id).map_err(pending_error)?;
        reservation
            .publish(PendingRequestConfirmation {
                id: id.clone(),
                kind,
                chain_id,
            })
            .map_err(pending_error)?;
        let confirmed = pending.await?;
        Ok(RequestConfirmationResult { id, confirmed })
    }
}

#[async_trait]
impl RequestConfirmationHandler for RequestConfirmationBridge {
    async fn confirm_sign_transaction_request(
        &self,
        id: String,
        transactions: Vec<Transaction>,
        chain_id: ChainId,
    ) -> Result<RequestConfirmationResult, WalletError> {
        RequestConfirmationBridge::confirm_sign_transaction_request(self, id, transactions, chain_id)
            .await
            .map_err(WalletError::other)
    }

    async fn confirm_sign_message_request(
        &self,
        id: String,
        message: Bytes,
        chain_id: ChainId,
    ) -> Result<RequestConfirmationResult, WalletError> {
        RequestConfirmationBridge::confirm_sign_message_request(self, id, message, chain_id)
            .await
            .map_err(WalletError::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{POLYGON, call};

    async fn next_pending(bridge: &RequestConfirmationBridge) -> PendingRequestConfirmation {
        let mut receiver = bridge.subscribe();
        let pending = receiver.wait_for(Option::is_some).await.unwrap();
        pending.clone().unwrap()
    }

    #[tokio::test]
    async fn test_sign_message_confirmed() {
        let bridge = Arc::new(RequestConfirmationBridge::new());
        let task = tokio::spawn({
            let bridge = Arc::clone(&bridge);
            async move {
                bridge
                    .confirm_sign_message_request("msg-1".into(), Bytes::from_static(b"hello"), POLYGON)
                    .await
            }
        });
        let pending = next_pending(&bridge).await;
        assert_eq!(
            pending.kind,
            RequestConfirmationKind::SignMessage {
                message: Bytes::from_static(b"hello")
            }
        );
        assert!(bridge.confirm("msg-1"));
        let result = task.await.unwrap().unwrap();
        assert_eq!(
            result,
            RequestConfirmationResult {
                id: "msg-1".into(),
                confirmed: true
            }
        );
        assert_eq!(bridge.pending(), None);
    }

    #[tokio::test]
    async fn test_sign_transaction_rejected_through_handler() {
        let bridge = Arc::new(RequestConfirmationBridge::new());
        let task = tokio::spawn({
            let bridge = Arc::clone(&bridge);
            async move {
                let handler: &dyn RequestConfirmationHandler = bridge.as_ref();
                handler
                    .confirm_sign_transaction_request("tx-1".into(), vec![call(1)], POLYGON)
                    .await
            }
        });
        let pending = next_pending(&bridge).await;
        assert!(matches!(pending.kind, RequestConfirmationKind::SignTransaction { ref transactions } if transactions.len() == 1));
        assert!(bridge.reject("tx-1"));
        let result = task.await.unwrap().unwrap();
        assert!(!result.confirmed);
    }

    #[tokio::test]
    async fn test_second_request_rejected_while_pending() {
        let bridge = Arc::new(RequestConfirmationBridge::new());
        let _first = tokio::spawn({
            let bridge = Arc::clone(&bridge);
            async move {
                bridge
                    .confirm_sign_message_request("a".into(), Bytes::new(), POLYGON)
                    .await
            }
        });
        next_pending(&bridge).await;
        let err = bridge
            .confirm_sign_message_request("b".into(), Bytes::new(), POLYGON)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestConfirmationError::ConfirmationPending { pending_id } if pending_id == "a"));
    }
}
