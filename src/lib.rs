//! Transaction-side coordination for EVM wallet SDKs.
//!
//! This crate sits between an application, the wallet it is connected to and
//! the Sequence indexer. It sends transaction batches through whichever kind of
//! wallet is connected, waits for them to be confirmed, suspends wallet flows
//! until the user has made a decision, and manages explicit sessions.
//!
//! # Modules
//!
//! - [`config`] - JSON configuration: chains, indexer, dispatch defaults
//! - [`connector`] - The connected wallet, as one of three kinds
//! - [`dispatch`] - [`send_transactions`](dispatch::send_transactions) over embedded, Sequence and EIP-1193 wallets
//! - [`fee_options`] - Fee-option confirmation between a wallet provider and the fee picker
//! - [`receipt`] - Waiting for a confirmation depth, with timeout and cancellation
//! - [`request_confirmation`] - Approval of raw sign requests
//! - [`sessions`] - Explicit session management on a session backend
//! - `telemetry` - Tracing subscriber and OpenTelemetry export (feature `telemetry`)
//!
//! Session permissions are built with
//! [`create_contract_permission`](seqkit_eip155::create_contract_permission)
//! from `seqkit-eip155`.
//!
//! # Feature Flags
//!
//! - `telemetry` - Tracing spans throughout, and the `telemetry` bootstrap

pub mod config;
pub mod connector;
pub mod dispatch;
pub mod fee_options;
pub mod receipt;
pub mod request_confirmation;
pub mod sessions;
mod slot;
#[cfg(feature = "telemetry")]
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use connector::Connector;
pub use dispatch::{SendTransactionsParams, send_transactions};
pub use fee_options::FeeOptionBridge;
pub use receipt::{WaitOptions, wait_for_transaction_receipt};
pub use request_confirmation::RequestConfirmationBridge;
pub use sessions::ExplicitSessions;
