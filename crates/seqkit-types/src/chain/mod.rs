//! Blockchain identifiers and chain-scoped helpers.
//!
//! - [`ChainId`] - A numeric EVM chain id (e.g., `137` for Polygon) rendered as CAIP-2 `eip155:137`
//! - [`ChainRegistry`] - Per-chain lookup of configured clients

mod chain_id;

pub use chain_id::*;

use std::collections::HashMap;

/// Registry of per-chain values indexed by chain id.
///
/// Used to keep one indexer client or one chain head per configured network.
#[derive(Debug)]
pub struct ChainRegistry<P>(HashMap<ChainId, P>);

impl<P> ChainRegistry<P> {
    pub fn new(entries: HashMap<ChainId, P>) -> Self {
        Self(entries)
    }

    /// Looks up a value by exact chain id.
    ///
    /// Returns `None` if nothing is configured for the given chain.
    pub fn by_chain_id(&self, chain_id: ChainId) -> Option<&P> {
        self.0.get(&chain_id)
    }

    /// All configured chain ids, in no particular order.
    pub fn chain_ids(&self) -> impl Iterator<Item = &ChainId> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<P> Default for ChainRegistry<P> {
    fn default() -> Self {
        Self(HashMap::new())
    }
}

impl<P> FromIterator<(ChainId, P)> for ChainRegistry<P> {
    fn from_iter<T: IntoIterator<Item = (ChainId, P)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
