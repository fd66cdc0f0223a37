use alloy_network::{Ethereum as AlloyEthereum, EthereumWallet, NetworkWallet, TransactionBuilder};
use alloy_primitives::{Address, B256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::layers::{FallbackLayer, ThrottleLayer};
use alloy_transport_http::Http;
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use seqkit_types::chain::ChainId;
use seqkit_types::config::RpcConfig;
use seqkit_types::transaction::Transaction;
use seqkit_types::wallet::{ChainHead, Eip1193Signer, WalletError};
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tower::ServiceBuilder;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::config::Eip155ChainConfig;

/// Errors while building a provider from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ProviderBuildError {
    #[error("No HTTP(S) RPC endpoint configured for {0}")]
    NoHttpTransport(ChainId),
    #[error("At least one signer should be provided for {0}")]
    NoSigners(ChainId),
    #[error("Invalid signer key: {0}")]
    InvalidSigner(String),
}

/// Builds a JSON-RPC client over every HTTP(S) endpoint in `rpc`.
///
/// Each endpoint is throttled to its `rate_limit` (requests per second), and the
/// endpoints are combined behind a fallback layer.
#[allow(unused_variables)] // chain_id is needed for tracing only here
pub fn rpc_client(chain_id: ChainId, rpc: &[RpcConfig]) -> Result<RpcClient, ProviderBuildError> {
    let transports = rpc
        .iter()
        .filter_map(|provider_config| {
            let scheme = provider_config.http.scheme();
            let is_http = scheme == "http" || scheme == "https";
            if !is_http {
                return None;
            }
            let rpc_url = provider_config.http.inner().clone();
            #[cfg(feature = "telemetry")]
            tracing::info!(chain=%chain_id, rpc_url=%rpc_url, rate_limit=?provider_config.rate_limit, "Using HTTP transport");
            let rate_limit = provider_config.rate_limit.unwrap_or(u32::MAX);
            let service = ServiceBuilder::new()
                .layer(ThrottleLayer::new(rate_limit))
                .service(Http::new(rpc_url));
            Some(service)
        })
        .collect::<Vec<_>>();
    let active = NonZeroUsize::new(transports.len())
        .ok_or(ProviderBuildError::NoHttpTransport(chain_id))?;
    let fallback = ServiceBuilder::new()
        .layer(FallbackLayer::default().with_active_transport_count(active))
        .service(transports);
    Ok(RpcClient::new(fallback, false))
}

/// The "public client": chain id and head of an EVM chain over JSON-RPC.
///
/// New heads are observed by polling `eth_blockNumber`.
#[derive(Clone)]
pub struct AlloyChainHead {
    chain_id: ChainId,
    provider: DynProvider,
    poll_interval: Duration,
}

impl AlloyChainHead {
    pub fn new(chain_id: ChainId, provider: DynProvider, poll_interval: Duration) -> Self {
        Self {
            chain_id,
            provider,
            poll_interval,
        }
    }

    pub fn from_config(
        chain_id: ChainId,
        config: &Eip155ChainConfig,
    ) -> Result<Self, ProviderBuildError> {
        let client = rpc_client(chain_id, &config.rpc)?;
        let provider = ProviderBuilder::new().connect_client(client).erased();
        Ok(Self::new(chain_id, provider, config.block_poll_interval()))
    }

    /// Chain this head was configured for. [`ChainHead::chain_id`] asks the node.
    pub fn configured_chain_id(&self) -> ChainId {
        self.chain_id
    }
}

impl std::fmt::Debug for AlloyChainHead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyChainHead")
            .field("chain_id", &self.chain_id)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChainHead for AlloyChainHead {
    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        let chain_id = self
            .provider
            .get_chain_id()
            .await
            .map_err(WalletError::other)?;
        Ok(ChainId::new(chain_id))
    }

    async fn block_number(&self) -> Result<u64, WalletError> {
        self.provider
            .get_block_number()
            .await
            .map_err(WalletError::other)
    }

    async fn watch_blocks(
        &self,
    ) -> Result<BoxStream<'static, Result<u64, WalletError>>, WalletError> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let state = (self.provider.clone(), ticker, None::<u64>);
        let blocks = stream::unfold(state, |(provider, mut ticker, last)| async move {
            loop {
                ticker.tick().await;
                match provider.get_block_number().await {
                    Ok(number) if Some(number) == last => continue,
                    Ok(number) => return Some((Ok(number), (provider, ticker, Some(number)))),
                    Err(e) => return Some((Err(WalletError::other(e)), (provider, ticker, last))),
                }
            }
        });
        Ok(blocks.boxed())
    }
}

/// An EIP-1193 signer backed by local keys and an alloy provider.
///
/// `eth_sendTransaction` is emulated: the provider fills gas, nonce and chain
/// id, signs with the key of `from` and broadcasts.
#[derive(Clone)]
pub struct AlloySigner {
    provider: DynProvider,
    accounts: Vec<Address>,
}

impl AlloySigner {
    pub fn from_config(
        chain_id: ChainId,
        config: &Eip155ChainConfig,
    ) -> Result<Self, ProviderBuildError> {
        let mut signers = config
            .signers
            .iter()
            .map(|key| {
                PrivateKeySigner::from_bytes(&B256::from(*key.inner().as_bytes()))
                    .map(|s| s.with_chain_id(Some(chain_id.inner())))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ProviderBuildError::InvalidSigner(e.to_string()))?
            .into_iter();
        let first = signers
            .next()
            .ok_or(ProviderBuildError::NoSigners(chain_id))?;
        let mut wallet = EthereumWallet::from(first);
        for signer in signers {
            wallet.register_signer(signer);
        }
        let accounts = NetworkWallet::<AlloyEthereum>::signer_addresses(&wallet).collect::<Vec<_>>();

        let client = rpc_client(chain_id, &config.rpc)?;
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_client(client)
            .erased();

        #[cfg(feature = "telemetry")]
        tracing::info!(chain=%chain_id, accounts=?accounts, "Using local EIP-1193 signer");

        Ok(Self { provider, accounts })
    }

    /// Addresses this signer can send from (`eth_accounts`).
    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }
}

impl std::fmt::Debug for AlloySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloySigner")
            .field("accounts", &self.accounts)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Eip1193Signer for AlloySigner {
    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        let chain_id = self
            .provider
            .get_chain_id()
            .await
            .map_err(WalletError::other)?;
        Ok(ChainId::new(chain_id))
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(from = %from, to = %transaction.to)))]
    async fn send_transaction(
        &self,
        from: Address,
        transaction: &Transaction,
    ) -> Result<B256, WalletError> {
        if !self.accounts.contains(&from) {
            return Err(WalletError::Backend(format!("Unknown account {from}")));
        }
        let mut request = TransactionRequest::default()
            .with_from(from)
            .with_to(transaction.to);
        if let Some(data) = &transaction.data {
            request.set_input(data.clone());
        }
        if let Some(value) = transaction.value {
            request.set_value(value);
        }
        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(WalletError::other)?;
        Ok(*pending.tx_hash())
    }
}
