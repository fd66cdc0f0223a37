//! Known EVM networks and their indexer names.
//!
//! Indexer endpoints are addressed by network name
//! (`https://{network}-indexer.sequence.app/`), so every chain the SDK talks to
//! needs a name. This module keeps the registry of well-known networks and the
//! two lookup directions between [`ChainId`] and name.
//!
//! # Example
//!
//! ```
//! use seqkit_types::chain::ChainId;
//! use seqkit_types::networks::{chain_id_by_network_name, network_name_by_chain_id};
//!
//! assert_eq!(chain_id_by_network_name("arbitrum"), Some(ChainId::new(42161)));
//! assert_eq!(network_name_by_chain_id(ChainId::new(8453)), Some("base"));
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::chain::ChainId;

/// A known network definition with its chain id and indexer name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Indexer network name (e.g., "polygon", "base-sepolia")
    pub name: &'static str,
    /// Numeric chain id
    pub chain_id: u64,
    /// Whether this is a test network
    pub testnet: bool,
}

impl NetworkInfo {
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.chain_id)
    }
}

const fn mainnet(name: &'static str, chain_id: u64) -> NetworkInfo {
    NetworkInfo {
        name,
        chain_id,
        testnet: false,
    }
}

const fn testnet(name: &'static str, chain_id: u64) -> NetworkInfo {
    NetworkInfo {
        name,
        chain_id,
        testnet: true,
    }
}

/// Registry of well-known networks.
pub static KNOWN_NETWORKS: &[NetworkInfo] = &[
    mainnet("mainnet", 1),
    mainnet("optimism", 10),
    mainnet("bsc", 56),
    mainnet("gnosis", 100),
    mainnet("polygon", 137),
    mainnet("polygon-zkevm", 1101),
    mainnet("base", 8453),
    mainnet("arbitrum", 42161),
    mainnet("arbitrum-nova", 42170),
    mainnet("avalanche", 43114),
    mainnet("blast", 81457),
    mainnet("xai", 660279),
    testnet("bsc-testnet", 97),
    testnet("avalanche-testnet", 43113),
    testnet("amoy", 80002),
    testnet("base-sepolia", 84532),
    testnet("arbitrum-sepolia", 421614),
    testnet("sepolia", 11155111),
    testnet("optimism-sepolia", 11155420),
];

static NAME_TO_CHAIN_ID: LazyLock<HashMap<&'static str, ChainId>> = LazyLock::new(|| {
    KNOWN_NETWORKS
        .iter()
        .map(|n| (n.name, n.chain_id()))
        .collect()
});

static CHAIN_ID_TO_NAME: LazyLock<HashMap<ChainId, &'static str>> = LazyLock::new(|| {
    KNOWN_NETWORKS
        .iter()
        .map(|n| (n.chain_id(), n.name))
        .collect()
});

/// Retrieves a chain id by its network name. The lookup is case-sensitive.
pub fn chain_id_by_network_name(name: &str) -> Option<ChainId> {
    NAME_TO_CHAIN_ID.get(name).copied()
}

/// Retrieves a network name by its chain id.
pub fn network_name_by_chain_id(chain_id: ChainId) -> Option<&'static str> {
    CHAIN_ID_TO_NAME.get(&chain_id).copied()
}

/// Returns the full network record for a chain id, if known.
pub fn network_info(chain_id: ChainId) -> Option<&'static NetworkInfo> {
    KNOWN_NETWORKS.iter().find(|n| n.chain_id == chain_id.inner())
}
