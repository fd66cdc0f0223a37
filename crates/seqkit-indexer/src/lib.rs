//! Indexer client for seqkit.
//!
//! Balances and transaction receipts come from the Sequence indexer rather
//! than from a node. This crate provides [`IndexerClient`], a thin reqwest
//! client over the indexer's JSON RPC that implements
//! [`Indexer`](seqkit_types::indexer::Indexer).
//!
//! # Feature Flags
//!
//! - `telemetry` - Tracing spans around every indexer call

mod client;

pub use client::*;
