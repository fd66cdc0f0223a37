#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for seqkit.
//!
//! This crate provides the foundational types shared by the seqkit crates: the
//! data model of fee options and transactions, the single-resolution [`deferred`]
//! value used to suspend a flow until a user decision arrives, the observable
//! [`store`] that publishes pending confirmations, and the traits through which
//! wallets, indexers and session backends are reached.
//!
//! It is chain-agnostic in spirit but EVM-shaped in practice: addresses, hashes
//! and amounts use `alloy-primitives`.
//!
//! # Modules
//!
//! - [`chain`] - Numeric EVM chain identifiers with CAIP-2 rendering
//! - [`config`] - RPC configuration and environment variable resolution
//! - [`deferred`] - Manually completed, settle-once values
//! - [`fee`] - Fee tokens, fee options and fee-option confirmations
//! - [`indexer`] - The [`Indexer`](indexer::Indexer) trait and its wire types
//! - [`networks`] - Registry of well-known networks and their indexer names
//! - [`session`] - Explicit session permissions and the session backend trait
//! - [`store`] - Observable single-slot confirmation state
//! - [`timestamp`] - Unix timestamps for session deadlines
//! - [`transaction`] - The EVM call that is the unit of dispatch
//! - [`util`] - Unit formatting and serde helpers
//! - [`wallet`] - Wallet traits (embedded, Sequence-native, EIP-1193) and confirmation handlers
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod chain;
pub mod config;
pub mod deferred;
pub mod fee;
pub mod indexer;
pub mod networks;
pub mod session;
pub mod store;
pub mod timestamp;
pub mod transaction;
pub mod util;
pub mod wallet;
