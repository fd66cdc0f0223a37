//! EVM chain access over alloy.
//!
//! - [`config`] - Per-chain configuration: RPC endpoints, indexer override, local signer keys
//! - [`provider`] - RPC client construction, [`AlloyChainHead`] and [`AlloySigner`]

pub mod config;
pub use config::*;

#[cfg(feature = "provider")]
pub mod provider;
#[cfg(feature = "provider")]
pub use provider::*;
