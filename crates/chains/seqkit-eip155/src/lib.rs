//! EIP-155 (EVM) support for seqkit.
//!
//! # Architecture
//!
//! - [`chain`] - Chain configuration and alloy-backed implementations of the
//!   [`ChainHead`](seqkit_types::wallet::ChainHead) and
//!   [`Eip1193Signer`](seqkit_types::wallet::Eip1193Signer) traits
//! - [`permission`] - Builds explicit-session permissions from ABI signatures
//!   and declarative parameter rules
//!
//! # Feature Flags
//!
//! - `provider` - alloy providers, signers and RPC transports (default)
//! - `telemetry` - Tracing instrumentation

pub mod chain;
pub mod permission;

pub use permission::{create_contract_permission, create_contract_permissions};
