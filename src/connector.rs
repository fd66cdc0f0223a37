use seqkit_types::chain::ChainId;
use seqkit_types::wallet::{Eip1193Signer, SequenceWallet, WaasWallet, WalletError};
use std::fmt;
use std::sync::Arc;

/// The connected wallet, resolved once when the wallet connects.
#[derive(Clone)]
pub enum Connector {
    /// Embedded wallet that relays batches and charges a token fee.
    Waas(Arc<dyn WaasWallet>),
    /// Smart-contract wallet that accepts a whole batch.
    Sequence(Arc<dyn SequenceWallet>),
    /// Any other signer; transactions go one at a time.
    Eip1193(Arc<dyn Eip1193Signer>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    Waas,
    Sequence,
    Eip1193,
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorKind::Waas => write!(f, "waas"),
            ConnectorKind::Sequence => write!(f, "sequence"),
            ConnectorKind::Eip1193 => write!(f, "eip1193"),
        }
    }
}

impl Connector {
    pub fn kind(&self) -> ConnectorKind {
        match self {
            Connector::Waas(_) => ConnectorKind::Waas,
            Connector::Sequence(_) => ConnectorKind::Sequence,
            Connector::Eip1193(_) => ConnectorKind::Eip1193,
        }
    }

    /// The chain the wallet is currently on.
    pub async fn chain_id(&self) -> Result<ChainId, WalletError> {
        match self {
            Connector::Waas(wallet) => wallet.chain_id().await,
            Connector::Sequence(wallet) => wallet.chain_id().await,
            Connector::Eip1193(signer) => signer.chain_id().await,
        }
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Connector").field(&self.kind()).finish()
    }
}
