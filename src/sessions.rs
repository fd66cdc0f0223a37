//! Explicit sessions: scoped, expiring permissions granted to a session key.
//!
//! [`ExplicitSessions`] turns [`ExplicitSessionParams`] into the
//! [`SessionConfig`] a [`SessionBackend`] stores, and keeps a cached copy of the
//! sessions the backend reports.

use alloy_primitives::Address;
use seqkit_types::fee::FeeToken;
use seqkit_types::session::{ExplicitSession, ExplicitSessionParams, SessionBackend, SessionConfig};
use seqkit_types::timestamp::UnixTimestamp;
use std::sync::{Mutex, PoisonError};

#[cfg(feature = "telemetry")]
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum SessionError<E> {
    #[error("Session expiry must be greater than zero")]
    InvalidExpiry,
    #[error("Session backend error: {0}")]
    Backend(#[source] E),
}

pub struct ExplicitSessions<B> {
    backend: B,
    sessions: Mutex<Vec<ExplicitSession>>,
}

impl<B: SessionBackend> ExplicitSessions<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Registers a session for `params`; returns the session key address.
    ///
    /// The cached list is refreshed afterwards.
    #[cfg_attr(feature = "telemetry", instrument(name = "sessions.add", skip_all, err, fields(chain = %params.chain_id, permissions = params.permissions.len())))]
    pub async fn add_explicit_session(
        &self,
        params: &ExplicitSessionParams,
    ) -> Result<Address, SessionError<B::Error>> {
        let config = Self::session_config(params, UnixTimestamp::now())?;
        let session_address = self
            .backend
            .add_explicit_session(config)
            .await
            .map_err(SessionError::Backend)?;
        self.get_all_explicit_sessions().await?;
        Ok(session_address)
    }

    /// Replaces the permissions of an existing session.
    #[cfg_attr(feature = "telemetry", instrument(name = "sessions.modify", skip_all, err, fields(session = %session_address)))]
    pub async fn modify_explicit_session(
        &self,
        session_address: Address,
        params: &ExplicitSessionParams,
    ) -> Result<(), SessionError<B::Error>> {
        let config = Self::session_config(params, UnixTimestamp::now())?;
        self.backend
            .modify_explicit_session(session_address, config)
            .await
            .map_err(SessionError::Backend)?;
        self.get_all_explicit_sessions().await?;
        Ok(())
    }

    /// Fetches every session from the backend and refreshes the cache.
    pub async fn get_all_explicit_sessions(
        &self,
    ) -> Result<Vec<ExplicitSession>, SessionError<B::Error>> {
        let sessions = self
            .backend
            .get_all_explicit_sessions()
            .await
            .map_err(SessionError::Backend)?;
        *self.sessions.lock().unwrap_or_else(PoisonError::into_inner) = sessions.clone();
        Ok(sessions)
    }

    /// Sessions as of the last refresh.
    pub fn sessions(&self) -> Vec<ExplicitSession> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Tokens the backend accepts for relay fees.
    pub async fn fee_tokens(&self) -> Result<Vec<FeeToken>, SessionError<B::Error>> {
        self.backend
            .get_fee_tokens()
            .await
            .map_err(SessionError::Backend)
    }

    fn session_config(
        params: &ExplicitSessionParams,
        now: UnixTimestamp,
    ) -> Result<SessionConfig, SessionError<B::Error>> {
        if params.expires_in.is_zero() {
            return Err(SessionError::InvalidExpiry);
        }
        Ok(SessionConfig::from_params(params, now))
    }
}

impl<B> std::fmt::Debug for ExplicitSessions<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .sessions
            .lock()
            .map(|s| s.len())
            .unwrap_or_default();
        f.debug_struct("ExplicitSessions")
            .field("sessions", &count)
            .finish_non_exhaustive()
    }
}
