//! Configuration loaded from a JSON file.
//!
//! ```json
//! {
//!   "project_access_key": "$SEQUENCE_PROJECT_ACCESS_KEY",
//!   "chains": {
//!     "eip155:137": {
//!       "rpc": [{ "http": "$POLYGON_RPC_URL", "rate_limit": 20 }]
//!     }
//!   },
//!   "transaction_confirmations": 2,
//!   "confirmation_timeout_secs": 120
//! }
//! ```
//!
//! Fields not present fall back to environment variables, then to the
//! defaults in [`config_defaults`].

use serde::{Deserialize, Serialize};
use seqkit_eip155::chain::{AlloyChainHead, AlloySigner, Eip155ChainConfig, ProviderBuildError};
use seqkit_indexer::{IndexerClient, IndexerClientError};
use seqkit_types::chain::ChainId;
use seqkit_types::config::LiteralOrEnv;
use std::env;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatch::DispatchOptions;
use crate::fee_options::FeeOptionBridgeConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "SEQKIT_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    project_access_key: Option<LiteralOrEnv<String>>,
    #[serde(default = "config_defaults::default_indexer_url_template")]
    indexer_url_template: String,
    #[serde(default)]
    chains: ChainsConfig,
    #[serde(default = "config_defaults::default_transaction_confirmations")]
    transaction_confirmations: u64,
    #[serde(default = "config_defaults::default_wait_confirmation_for_last_transaction")]
    wait_confirmation_for_last_transaction: bool,
    #[serde(default)]
    confirmation_timeout_secs: Option<u64>,
    #[serde(default)]
    skip_fee_balance_check: bool,
}

/// Per-chain configuration, keyed by chain id.
///
/// Serialized as a map from CAIP-2 (or bare numeric) chain ids to
/// [`Eip155ChainConfig`]. A chain may appear only once.
#[derive(Debug, Clone, Default)]
pub struct ChainsConfig(pub Vec<(ChainId, Eip155ChainConfig)>);

impl Deref for ChainsConfig {
    type Target = Vec<(ChainId, Eip155ChainConfig)>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Serialize for ChainsConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (chain_id, config) in &self.0 {
            map.serialize_entry(&chain_id.to_string(), config)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ChainsConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{MapAccess, Visitor};
        use std::fmt;

        struct ChainsVisitor;

        impl<'de> Visitor<'de> for ChainsVisitor {
            type Value = ChainsConfig;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of chain identifiers to chain configurations")
            }

            fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut chains: Vec<(ChainId, Eip155ChainConfig)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(chain_id) = access.next_key::<ChainId>()? {
                    if chains.iter().any(|(known, _)| *known == chain_id) {
                        return Err(serde::de::Error::custom(format!(
                            "Duplicate chain {chain_id}"
                        )));
                    }
                    let config: Eip155ChainConfig = access.next_value()?;
                    chains.push((chain_id, config));
                }
                Ok(ChainsConfig(chains))
            }
        }

        deserializer.deserialize_map(ChainsVisitor)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            project_access_key: None,
            indexer_url_template: config_defaults::default_indexer_url_template(),
            chains: ChainsConfig::default(),
            transaction_confirmations: config_defaults::default_transaction_confirmations(),
            wait_confirmation_for_last_transaction:
                config_defaults::default_wait_confirmation_for_last_transaction(),
            confirmation_timeout_secs: None,
            skip_fee_balance_check: false,
        }
    }
}

pub mod config_defaults {
    use std::env;

    pub use seqkit_indexer::DEFAULT_INDEXER_URL_TEMPLATE;
    pub const DEFAULT_TRANSACTION_CONFIRMATIONS: u64 = 1;

    /// `$INDEXER_URL_TEMPLATE`, then [`DEFAULT_INDEXER_URL_TEMPLATE`].
    pub fn default_indexer_url_template() -> String {
        env::var("INDEXER_URL_TEMPLATE")
            .unwrap_or_else(|_| DEFAULT_INDEXER_URL_TEMPLATE.to_owned())
    }

    /// `$TRANSACTION_CONFIRMATIONS`, then 1.
    pub fn default_transaction_confirmations() -> u64 {
        env::var("TRANSACTION_CONFIRMATIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TRANSACTION_CONFIRMATIONS)
    }

    pub fn default_wait_confirmation_for_last_transaction() -> bool {
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("Chain {0} is not configured")]
    UnknownChain(ChainId),
    #[error(transparent)]
    Indexer(#[from] IndexerClientError),
    #[error(transparent)]
    Provider(#[from] ProviderBuildError),
}

impl Config {
    pub fn project_access_key(&self) -> Option<&str> {
        self.project_access_key.as_ref().map(|k| k.inner().as_str())
    }

    pub fn indexer_url_template(&self) -> &str {
        &self.indexer_url_template
    }

    pub fn chains(&self) -> &ChainsConfig {
        &self.chains
    }

    pub fn chain(&self, chain_id: ChainId) -> Option<&Eip155ChainConfig> {
        self.chains
            .iter()
            .find(|(known, _)| *known == chain_id)
            .map(|(_, config)| config)
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            transaction_confirmations: self.transaction_confirmations,
            wait_confirmation_for_last_transaction: self.wait_confirmation_for_last_transaction,
            confirmation_timeout: self.confirmation_timeout_secs.map(Duration::from_secs),
            ..Default::default()
        }
    }

    pub fn fee_option_bridge_config(&self) -> FeeOptionBridgeConfig {
        FeeOptionBridgeConfig {
            skip_fee_balance_check: self.skip_fee_balance_check,
        }
    }

    /// Indexer for `chain_id`: the chain's `indexer_url` if set, otherwise the
    /// URL template filled with the chain's network name.
    pub fn indexer_for(&self, chain_id: ChainId) -> Result<IndexerClient, ConfigError> {
        let override_url = self.chain(chain_id).and_then(|c| c.indexer_url.as_ref());
        let client = match override_url {
            Some(url) => IndexerClient::try_new(url.inner().clone())?,
            None => IndexerClient::for_chain(&self.indexer_url_template, chain_id)?,
        };
        match self.project_access_key() {
            Some(key) => Ok(client.with_access_key(key)?),
            None => Ok(client),
        }
    }

    pub fn chain_head_for(&self, chain_id: ChainId) -> Result<AlloyChainHead, ConfigError> {
        let config = self
            .chain(chain_id)
            .ok_or(ConfigError::UnknownChain(chain_id))?;
        Ok(AlloyChainHead::from_config(chain_id, config)?)
    }

    pub fn signer_for(&self, chain_id: ChainId) -> Result<AlloySigner, ConfigError> {
        let config = self
            .chain(chain_id)
            .ok_or(ConfigError::UnknownChain(chain_id))?;
        Ok(AlloySigner::from_config(chain_id, config)?)
    }

    /// Loads `.env`, then the file named by `$SEQKIT_CONFIG` (default `seqkit.json`).
    ///
    /// Environment references inside the file are resolved after `.env` is loaded.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "seqkit.json".to_owned());
        let path = PathBuf::from(path);
        let config_path = Path::new(&path)
            .canonicalize()
            .map_err(|e| ConfigError::FileRead(path, e))?;
        Self::load_from_path(config_path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> Config {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_chains_keyed_by_caip2() {
        let config = config(json!({
            "chains": {
                "eip155:137": { "rpc": [{ "http": "https://polygon.example" }] },
                "8453": { "rpc": [{ "http": "https://base.example" }], "block_poll_interval_ms": 500 }
            }
        }));
        assert_eq!(config.chains().len(), 2);
        assert!(config.chain(ChainId::new(137)).is_some());
        let base = config.chain(ChainId::new(8453)).unwrap();
        assert_eq!(base.block_poll_interval(), Duration::from_millis(500));
        assert!(config.chain(ChainId::new(1)).is_none());
    }

    #[test]
    fn test_duplicate_chain_rejected() {
        let result = serde_json::from_str::<Config>(
            r#"{ "chains": {
                "eip155:137": { "rpc": [] },
                "137": { "rpc": [] }
            } }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_non_evm_namespace_rejected() {
        let result = serde_json::from_value::<Config>(json!({
            "chains": { "solana:mainnet": { "rpc": [] } }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_dispatch_options_from_config() {
        let config = config(json!({
            "transaction_confirmations": 3,
            "wait_confirmation_for_last_transaction": false,
            "confirmation_timeout_secs": 90,
            "skip_fee_balance_check": true
        }));
        let options = config.dispatch_options();
        assert_eq!(options.transaction_confirmations, 3);
        assert!(!options.wait_confirmation_for_last_transaction);
        assert_eq!(options.confirmation_timeout, Some(Duration::from_secs(90)));
        assert!(config.fee_option_bridge_config().skip_fee_balance_check);
    }

    #[test]
    fn test_indexer_url_override_and_template() {
        let config = config(json!({
            "project_access_key": "key-123",
            "indexer_url_template": "https://{network}-indexer.example/",
            "chains": {
                "eip155:137": {
                    "rpc": [],
                    "indexer_url": "https://custom-indexer.example/polygon/"
                }
            }
        }));
        let polygon = config.indexer_for(ChainId::new(137)).unwrap();
        assert_eq!(polygon.base_url().as_str(), "https://custom-indexer.example/polygon/");
        assert_eq!(
            polygon.headers()[seqkit_indexer::ACCESS_KEY_HEADER].to_str().unwrap(),
            "key-123"
        );
        let base = config.indexer_for(ChainId::new(8453)).unwrap();
        assert_eq!(base.base_url().as_str(), "https://base-indexer.example/");
        assert!(matches!(
            config.indexer_for(ChainId::new(999_999)),
            Err(ConfigError::Indexer(IndexerClientError::UnknownNetwork(_)))
        ));
    }

    #[test]
    fn test_unconfigured_chain_has_no_head() {
        let config = Config::default();
        assert!(matches!(
            config.chain_head_for(ChainId::new(137)),
            Err(ConfigError::UnknownChain(_))
        ));
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = Config::load_from_path("/nonexistent/seqkit.json").unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(..)));
    }
}
