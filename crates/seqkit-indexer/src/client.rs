//! An [`Indexer`] implementation that talks to a Sequence indexer over HTTP.
//!
//! [`IndexerClient`] calls the indexer's JSON RPC endpoints
//! (`/rpc/Indexer/<Method>`, always `POST`) and authenticates with the project
//! access key in the `X-Access-Key` header.
//!
//! ```rust
//! use seqkit_indexer::IndexerClient;
//!
//! let indexer = IndexerClient::try_from("https://polygon-indexer.sequence.app").unwrap();
//! ```

use alloy_primitives::{Address, B256, U256};
use http::{HeaderMap, HeaderValue, StatusCode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use seqkit_types::chain::ChainId;
use seqkit_types::indexer::{Indexer, TokenBalance, TransactionReceipt};
use seqkit_types::util::decimal_u256;
use std::fmt::Display;
use std::time::Duration;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

/// Placeholder for the network name in indexer URL templates.
pub const NETWORK_PLACEHOLDER: &str = "{network}";

/// Default indexer URL template.
pub const DEFAULT_INDEXER_URL_TEMPLATE: &str = "https://{network}-indexer.sequence.app/";

/// Header carrying the project access key.
pub const ACCESS_KEY_HEADER: &str = "x-access-key";

/// Errors that can occur while interacting with the indexer.
#[derive(Debug, thiserror::Error)]
pub enum IndexerClientError {
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        context: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("No indexer network name known for {0}")]
    UnknownNetwork(ChainId),
    #[error("Invalid access key: {0}")]
    InvalidAccessKey(#[source] http::header::InvalidHeaderValue),
    #[error("HTTP error: {context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        context: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetNativeTokenBalanceRequest {
    account_address: Address,
}

#[derive(Debug, Deserialize)]
struct GetNativeTokenBalanceResponse {
    balance: NativeTokenBalance,
}

#[derive(Debug, Deserialize)]
struct NativeTokenBalance {
    #[serde(with = "decimal_u256")]
    balance: U256,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalancesFilter<'a> {
    account_addresses: [Address; 1],
    contract_addresses: &'a [Address],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetTokenBalancesByContractRequest<'a> {
    filter: TokenBalancesFilter<'a>,
    omit_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct GetTokenBalancesByContractResponse {
    #[serde(default)]
    balances: Vec<TokenBalance>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchTransactionReceiptRequest {
    txn_hash: B256,
}

#[derive(Debug, Deserialize)]
struct FetchTransactionReceiptResponse {
    receipt: TransactionReceipt,
}

/// A client for one chain's indexer.
#[derive(Clone, Debug)]
pub struct IndexerClient {
    /// Base URL of the indexer (e.g. `https://polygon-indexer.sequence.app/`)
    base_url: Url,
    native_balance_url: Url,
    token_balances_url: Url,
    receipt_url: Url,
    client: Client,
    /// Custom headers sent with each request, the access key among them
    headers: HeaderMap,
    timeout: Option<Duration>,
}

impl IndexerClient {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn timeout(&self) -> &Option<Duration> {
        &self.timeout
    }

    /// Constructs a client from a base URL; RPC endpoint URLs are resolved against it.
    pub fn try_new(base_url: Url) -> Result<Self, IndexerClientError> {
        let rpc_url = |method: &'static str, context: &'static str| {
            base_url
                .join(&format!("./rpc/Indexer/{method}"))
                .map_err(|e| IndexerClientError::UrlParse { context, source: e })
        };
        let native_balance_url = rpc_url(
            "GetNativeTokenBalance",
            "Failed to construct GetNativeTokenBalance URL",
        )?;
        let token_balances_url = rpc_url(
            "GetTokenBalancesByContract",
            "Failed to construct GetTokenBalancesByContract URL",
        )?;
        let receipt_url = rpc_url(
            "FetchTransactionReceipt",
            "Failed to construct FetchTransactionReceipt URL",
        )?;
        Ok(Self {
            client: Client::new(),
            base_url,
            native_balance_url,
            token_balances_url,
            receipt_url,
            headers: HeaderMap::new(),
            timeout: None,
        })
    }

    /// Builds the client for `chain_id` from a URL template such as
    /// [`DEFAULT_INDEXER_URL_TEMPLATE`].
    pub fn for_chain(template: &str, chain_id: ChainId) -> Result<Self, IndexerClientError> {
        let network = chain_id
            .as_network_name()
            .ok_or(IndexerClientError::UnknownNetwork(chain_id))?;
        IndexerClient::try_from(template.replace(NETWORK_PLACEHOLDER, network))
    }

    /// Attaches custom headers to all future requests.
    pub fn with_headers(&self, headers: HeaderMap) -> Self {
        let mut this = self.clone();
        this.headers = headers;
        this
    }

    /// Sends `access_key` as `X-Access-Key` with all future requests.
    pub fn with_access_key(&self, access_key: &str) -> Result<Self, IndexerClientError> {
        let value =
            HeaderValue::from_str(access_key).map_err(IndexerClientError::InvalidAccessKey)?;
        let mut this = self.clone();
        this.headers.insert(ACCESS_KEY_HEADER, value);
        Ok(this)
    }

    /// Sets a timeout for all future requests.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut this = self.clone();
        this.timeout = Some(timeout);
        this
    }

    /// `GetNativeTokenBalance` for `account`.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "seqkit.indexer.native_token_balance", skip(self), err)
    )]
    pub async fn native_token_balance(&self, account: Address) -> Result<U256, IndexerClientError> {
        let request = GetNativeTokenBalanceRequest {
            account_address: account,
        };
        let response: GetNativeTokenBalanceResponse = self
            .post_json(&self.native_balance_url, "POST GetNativeTokenBalance", &request)
            .await?;
        Ok(response.balance.balance)
    }

    /// `GetTokenBalancesByContract` for `account`, restricted to `contracts`.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "seqkit.indexer.token_balances", skip(self, contracts), fields(contracts = contracts.len()), err)
    )]
    pub async fn token_balances(
        &self,
        account: Address,
        contracts: &[Address],
    ) -> Result<Vec<TokenBalance>, IndexerClientError> {
        let request = GetTokenBalancesByContractRequest {
            filter: TokenBalancesFilter {
                account_addresses: [account],
                contract_addresses: contracts,
            },
            omit_metadata: false,
        };
        let response: GetTokenBalancesByContractResponse = self
            .post_json(
                &self.token_balances_url,
                "POST GetTokenBalancesByContract",
                &request,
            )
            .await?;
        Ok(response.balances)
    }

    /// `FetchTransactionReceipt`; the indexer holds the request until the
    /// transaction is mined or its own deadline passes.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "seqkit.indexer.fetch_transaction_receipt", skip(self), err)
    )]
    pub async fn fetch_transaction_receipt(
        &self,
        txn_hash: B256,
    ) -> Result<TransactionReceipt, IndexerClientError> {
        let request = FetchTransactionReceiptRequest { txn_hash };
        let response: FetchTransactionReceiptResponse = self
            .post_json(&self.receipt_url, "POST FetchTransactionReceipt", &request)
            .await?;
        Ok(response.receipt)
    }

    /// POST helper: JSON in, JSON out, with error mapping, headers and timeout applied.
    ///
    /// `context` names the call in tracing and error messages (e.g. `"POST FetchTransactionReceipt"`).
    async fn post_json<T, R>(
        &self,
        url: &Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, IndexerClientError>
    where
        T: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let mut req = self.client.post(url.clone()).json(payload);
        for (key, value) in self.headers.iter() {
            req = req.header(key, value);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| IndexerClientError::Http { context, source: e })?;

        let result = if http_response.status() == StatusCode::OK {
            http_response
                .json::<R>()
                .await
                .map_err(|e| IndexerClientError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| IndexerClientError::ResponseBodyRead { context, source: e })?;
            Err(IndexerClientError::HttpStatus {
                context,
                status,
                body,
            })
        };

        record_result_on_span(&result);

        result
    }
}

impl Indexer for IndexerClient {
    type Error = IndexerClientError;

    async fn native_token_balance(&self, account: Address) -> Result<U256, Self::Error> {
        IndexerClient::native_token_balance(self, account).await
    }

    async fn token_balances(
        &self,
        account: Address,
        contracts: &[Address],
    ) -> Result<Vec<TokenBalance>, Self::Error> {
        IndexerClient::token_balances(self, account, contracts).await
    }

    async fn fetch_transaction_receipt(
        &self,
        txn_hash: B256,
    ) -> Result<TransactionReceipt, Self::Error> {
        IndexerClient::fetch_transaction_receipt(self, txn_hash).await
    }
}

/// Parses a base URL, normalized to a single trailing slash.
impl TryFrom<&str> for IndexerClient {
    type Error = IndexerClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut normalized = value.trim_end_matches('/').to_string();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| IndexerClientError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        IndexerClient::try_new(url)
    }
}

impl TryFrom<String> for IndexerClient {
    type Error = IndexerClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        IndexerClient::try_from(value.as_str())
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to indexer failed");
        }
    }
}

#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};
    use seqkit_types::indexer::TransactionStatus;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACCOUNT: Address = address!("0x0000000000000000000000000000000000000011");
    const USDC: Address = address!("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359");

    async fn client(server: &MockServer) -> IndexerClient {
        IndexerClient::try_from(server.uri())
            .unwrap()
            .with_access_key("test-key")
            .unwrap()
    }

    #[tokio::test]
    async fn test_native_token_balance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc/Indexer/GetNativeTokenBalance"))
            .and(header("X-Access-Key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "accountAddress": "0x0000000000000000000000000000000000000011"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "balance": {
                    "accountAddress": "0x0000000000000000000000000000000000000011",
                    "balance": "1500000000000000000"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let balance = client(&server).await.native_token_balance(ACCOUNT).await.unwrap();
        assert_eq!(balance, U256::from(1_500_000_000_000_000_000u64));
    }

    #[tokio::test]
    async fn test_token_balances() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc/Indexer/GetTokenBalancesByContract"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "page": { "page": 1, "more": false },
                "balances": [{
                    "contractType": "ERC20",
                    "contractAddress": "0x3c499c542cef5e3811e1192ce70d8cc03d5c3359",
                    "accountAddress": "0x0000000000000000000000000000000000000011",
                    "balance": "2500000",
                    "blockNumber": 42,
                    "chainId": 137,
                    "contractInfo": { "name": "USD Coin", "symbol": "USDC", "decimals": 6 }
                }]
            })))
            .mount(&server)
            .await;

        let balances = client(&server)
            .await
            .token_balances(ACCOUNT, &[USDC])
            .await
            .unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].contract_address, USDC);
        assert_eq!(balances[0].balance, U256::from(2_500_000u64));
        assert_eq!(balances[0].contract_info.as_ref().unwrap().decimals, Some(6));
    }

    #[tokio::test]
    async fn test_fetch_transaction_receipt() {
        let server = MockServer::start().await;
        let hash = b256!("0x1111111111111111111111111111111111111111111111111111111111111111");
        Mock::given(method("POST"))
            .and(path("/rpc/Indexer/FetchTransactionReceipt"))
            .and(body_partial_json(serde_json::json!({ "txnHash": hash })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "receipt": {
                    "txnHash": hash,
                    "txnStatus": "SUCCESSFUL",
                    "blockNumber": 100,
                    "final": true
                }
            })))
            .mount(&server)
            .await;

        let receipt = client(&server)
            .await
            .fetch_transaction_receipt(hash)
            .await
            .unwrap();
        assert_eq!(receipt.txn_status, TransactionStatus::Successful);
        assert_eq!(receipt.block_number, 100);
    }

    #[tokio::test]
    async fn test_http_status_error_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc/Indexer/GetNativeTokenBalance"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .native_token_balance(ACCOUNT)
            .await
            .unwrap_err();
        match err {
            IndexerClientError::HttpStatus { status, body, .. } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_for_chain_uses_network_name() {
        let client = IndexerClient::for_chain(DEFAULT_INDEXER_URL_TEMPLATE, ChainId::new(137)).unwrap();
        assert_eq!(
            client.base_url().as_str(),
            "https://polygon-indexer.sequence.app/"
        );
        assert!(matches!(
            IndexerClient::for_chain(DEFAULT_INDEXER_URL_TEMPLATE, ChainId::new(999_999)),
            Err(IndexerClientError::UnknownNetwork(_))
        ));
    }
}
