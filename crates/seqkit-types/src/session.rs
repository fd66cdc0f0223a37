//! Explicit sessions: scoped, time-limited signing authority.
//!
//! An explicit session lets a session key act for the wallet within limits: a
//! native-token spending cap, a deadline, and a list of [`Permission`]s saying
//! which contracts (and which calls with which arguments) it may touch.
//!
//! A [`ParameterRule`] compares one 32-byte word of calldata against a value:
//! the word at `offset` is masked with `mask` and compared with `value` using
//! `operation`. With `cumulative` set the compared quantity accumulates across
//! calls within the session.

use alloy_primitives::{Address, B256, U256};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use crate::chain::ChainId;
use crate::fee::FeeToken;
use crate::timestamp::UnixTimestamp;
use crate::util::decimal_u256;

/// Comparison applied by a [`ParameterRule`]. Encoded as its numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParameterOperation {
    Equal = 0,
    NotEqual = 1,
    GreaterThanOrEqual = 2,
    LessThanOrEqual = 3,
}

impl TryFrom<u8> for ParameterOperation {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Equal),
            1 => Ok(Self::NotEqual),
            2 => Ok(Self::GreaterThanOrEqual),
            3 => Ok(Self::LessThanOrEqual),
            other => Err(other),
        }
    }
}

impl Serialize for ParameterOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl FromStr for ParameterOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EQUAL" => Ok(Self::Equal),
            "NOT_EQUAL" => Ok(Self::NotEqual),
            "GREATER_THAN_OR_EQUAL" => Ok(Self::GreaterThanOrEqual),
            "LESS_THAN_OR_EQUAL" => Ok(Self::LessThanOrEqual),
            other => Err(format!("unknown parameter operation {other}")),
        }
    }
}

/// Accepts the numeric encoding as well as the condition name (`"LESS_THAN_OR_EQUAL"`).
impl<'de> Deserialize<'de> for ParameterOperation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OperationVisitor;

        impl Visitor<'_> for OperationVisitor {
            type Value = ParameterOperation;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a parameter operation code or name")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                u8::try_from(v)
                    .ok()
                    .and_then(|v| ParameterOperation::try_from(v).ok())
                    .ok_or_else(|| E::custom(format!("unknown parameter operation {v}")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                let v = u64::try_from(v)
                    .map_err(|_| E::custom(format!("unknown parameter operation {v}")))?;
                self.visit_u64(v)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(OperationVisitor)
    }
}

/// One condition on a word of calldata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterRule {
    pub cumulative: bool,
    pub operation: ParameterOperation,
    pub value: B256,
    pub offset: U256,
    pub mask: B256,
}

/// Calls to `target` allowed to the session, restricted by `rules`.
///
/// No rules means any call to `target` is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub target: Address,
    #[serde(default)]
    pub rules: Vec<ParameterRule>,
}

impl Permission {
    pub fn allow_all(target: Address) -> Self {
        Self {
            target,
            rules: Vec::new(),
        }
    }
}

/// Native-token spending allowance of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTokenSpending {
    #[serde(with = "decimal_u256")]
    pub value_limit: U256,
    #[serde(default)]
    pub allowed_recipients: Vec<Address>,
}

/// Session lifetime, counted from the moment it is submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiresIn {
    #[serde(default)]
    pub days: u64,
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
}

impl ExpiresIn {
    pub fn as_duration(&self) -> Duration {
        let minutes = self
            .days
            .saturating_mul(24 * 60)
            .saturating_add(self.hours.saturating_mul(60))
            .saturating_add(self.minutes);
        Duration::from_secs(minutes.saturating_mul(60))
    }

    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0
    }
}

/// What an application asks for when it opens a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplicitSessionParams {
    pub chain_id: ChainId,
    #[serde(default)]
    pub native_token_spending: NativeTokenSpending,
    pub expires_in: ExpiresIn,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// What is submitted to the session backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub chain_id: ChainId,
    #[serde(with = "decimal_u256")]
    pub value_limit: U256,
    pub deadline: UnixTimestamp,
    pub permissions: Vec<Permission>,
}

impl SessionConfig {
    /// Builds the submitted configuration from request parameters.
    ///
    /// Each allowed native-token recipient becomes a rule-less permission,
    /// ahead of the contract permissions.
    pub fn from_params(params: &ExplicitSessionParams, now: UnixTimestamp) -> Self {
        let permissions = params
            .native_token_spending
            .allowed_recipients
            .iter()
            .copied()
            .map(Permission::allow_all)
            .chain(params.permissions.iter().cloned())
            .collect();
        Self {
            chain_id: params.chain_id,
            value_limit: params.native_token_spending.value_limit,
            deadline: now + params.expires_in.as_duration(),
            permissions,
        }
    }
}

/// A session as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplicitSession {
    pub session_address: Address,
    pub chain_id: ChainId,
    pub config: SessionConfig,
}

/// The wallet-side service that stores explicit sessions.
pub trait SessionBackend: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Registers a new session; returns the session key address.
    fn add_explicit_session(
        &self,
        config: SessionConfig,
    ) -> impl Future<Output = Result<Address, Self::Error>> + Send;

    fn modify_explicit_session(
        &self,
        session_address: Address,
        config: SessionConfig,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn get_all_explicit_sessions(
        &self,
    ) -> impl Future<Output = Result<Vec<ExplicitSession>, Self::Error>> + Send;

    /// Tokens the backend accepts for relay fees.
    fn get_fee_tokens(&self) -> impl Future<Output = Result<Vec<FeeToken>, Self::Error>> + Send;
}
