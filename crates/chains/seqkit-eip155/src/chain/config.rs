use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use seqkit_types::config::{LiteralOrEnv, RpcConfig};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Per-chain configuration of an EVM network.
///
/// ```json
/// {
///   "rpc": [{ "http": "$POLYGON_RPC_URL", "rate_limit": 20 }],
///   "indexer_url": "https://polygon-indexer.sequence.app/",
///   "signers": ["$SESSION_KEY"]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eip155ChainConfig {
    /// RPC providers, tried in order with fallback.
    pub rpc: Vec<RpcConfig>,
    /// Overrides the indexer URL derived from the network name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexer_url: Option<LiteralOrEnv<Url>>,
    /// Local keys for the alloy-backed EIP-1193 signer. Empty when the chain is
    /// only read from.
    #[serde(default, skip_serializing)]
    pub signers: Eip155SignersConfig,
    /// How often the chain head is polled for new blocks.
    #[serde(default = "eip155_chain_config::default_block_poll_interval_ms")]
    pub block_poll_interval_ms: u64,
}

impl Eip155ChainConfig {
    pub fn block_poll_interval(&self) -> Duration {
        Duration::from_millis(self.block_poll_interval_ms)
    }
}

mod eip155_chain_config {
    pub fn default_block_poll_interval_ms() -> u64 {
        2_000
    }
}

/// Private keys (hex, 0x-prefixed) or environment variable references.
pub type Eip155SignersConfig = Vec<LiteralOrEnv<EvmPrivateKey>>;

/// A validated EVM private key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EvmPrivateKey(B256);

impl EvmPrivateKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_ref()
    }
}

impl std::fmt::Debug for EvmPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EvmPrivateKey(..)")
    }
}

impl FromStr for EvmPrivateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid evm private key: {}", e))
    }
}
