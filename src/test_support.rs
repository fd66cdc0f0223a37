//! In-memory wallets, indexer and chain head shared by the unit tests.

use alloy_primitives::{Address, B256, U256, address};
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use seqkit_types::chain::ChainId;
use seqkit_types::fee::{FeeOption, FeeToken, FeeTokenType};
use seqkit_types::indexer::{
    ContractType, Indexer, TokenBalance, TransactionReceipt, TransactionStatus,
};
use seqkit_types::transaction::Transaction;
use seqkit_types::wallet::{
    ChainHead, Eip1193Signer, SequenceWallet, WaasFeeOptions, WaasSendRequest, WaasSendResponse,
    WaasWallet, WalletError,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const POLYGON: ChainId = ChainId::new(137);
pub const ACCOUNT: Address = address!("0x00000000000000000000000000000000000000a1");
pub const USDC: Address = address!("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359");
pub const DAI: Address = address!("0x8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063");

/// Ordered record of what the fakes were asked to do.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Hash the fakes assign to a transaction: its target, left-padded.
pub fn hash_of(transaction: &Transaction) -> B256 {
    B256::left_padding_from(transaction.to.as_slice())
}

pub fn call(last_byte: u8) -> Transaction {
    let mut to = [0u8; 20];
    to[19] = last_byte;
    Transaction::new(Address::from(to))
}

pub fn fee_option(contract_address: Option<Address>, value: u64) -> FeeOption {
    FeeOption {
        token: FeeToken {
            chain_id: POLYGON,
            name: "Token".into(),
            symbol: if contract_address.is_some() { "ERC20" } else { "POL" }.into(),
            token_type: if contract_address.is_some() {
                FeeTokenType::Erc20Token
            } else {
                FeeTokenType::Unknown
            },
            decimals: contract_address.map(|_| 6),
            logo_url: String::new(),
            contract_address,
            token_id: None,
        },
        to: Address::ZERO,
        value: U256::from(value),
        gas_limit: 21_000,
    }
}

#[derive(Debug, thiserror::Error)]
#[error("fake indexer: {0}")]
pub struct FakeIndexerError(pub String);

#[derive(Debug, Default)]
pub struct FakeIndexer {
    pub native: U256,
    pub tokens: HashMap<Address, U256>,
    /// Receipts default to successful, mined at `receipt_block`.
    pub receipt_block: u64,
    pub failed: Vec<B256>,
    pub log: EventLog,
}

impl FakeIndexer {
    pub fn with_balances(native: u64, tokens: &[(Address, u64)]) -> Self {
        Self {
            native: U256::from(native),
            tokens: tokens
                .iter()
                .map(|(contract, balance)| (*contract, U256::from(*balance)))
                .collect(),
            receipt_block: 100,
            ..Default::default()
        }
    }
}

impl Indexer for FakeIndexer {
    type Error = FakeIndexerError;

    async fn native_token_balance(&self, _account: Address) -> Result<U256, FakeIndexerError> {
        self.log.push("balance native".into());
        Ok(self.native)
    }

    async fn token_balances(
        &self,
        account: Address,
        contracts: &[Address],
    ) -> Result<Vec<TokenBalance>, FakeIndexerError> {
        self.log.push(format!("balance tokens {}", contracts.len()));
        Ok(contracts
            .iter()
            .filter_map(|contract| {
                self.tokens.get(contract).map(|balance| TokenBalance {
                    contract_type: ContractType::Erc20,
                    contract_address: *contract,
                    account_address: account,
                    token_id: None,
                    balance: *balance,
                    block_number: self.receipt_block,
                    chain_id: Some(POLYGON),
                    contract_info: None,
                })
            })
            .collect())
    }

    async fn fetch_transaction_receipt(
        &self,
        txn_hash: B256,
    ) -> Result<TransactionReceipt, FakeIndexerError> {
        self.log.push(format!("receipt {txn_hash}"));
        let txn_status = if self.failed.contains(&txn_hash) {
            TransactionStatus::Failed
        } else {
            TransactionStatus::Successful
        };
        Ok(TransactionReceipt {
            txn_hash,
            txn_status,
            block_number: self.receipt_block,
            block_hash: None,
            is_final: false,
            reason: None,
        })
    }
}

/// Emits `blocks` in order, then stalls forever.
#[derive(Debug, Clone)]
pub struct FakeChainHead {
    pub chain_id: ChainId,
    pub blocks: Vec<u64>,
}

impl FakeChainHead {
    pub fn at(chain_id: ChainId, head: u64) -> Self {
        Self {
            chain_id,
            blocks: (head..head + 5).collect(),
        }
    }
}

#[async_trait]
impl ChainHead for FakeChainHead {
    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> Result<u64, WalletError> {
        Ok(self.blocks.first().copied().unwrap_or_default())
    }

    async fn watch_blocks(
        &self,
    ) -> Result<BoxStream<'static, Result<u64, WalletError>>, WalletError> {
        let blocks = stream::iter(self.blocks.clone().into_iter().map(Ok));
        Ok(blocks.chain(stream::pending()).boxed())
    }
}

#[derive(Debug)]
pub struct FakeSigner {
    pub chain_id: ChainId,
    pub log: EventLog,
}

#[async_trait]
impl Eip1193Signer for FakeSigner {
    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        Ok(self.chain_id)
    }

    async fn send_transaction(
        &self,
        from: Address,
        transaction: &Transaction,
    ) -> Result<B256, WalletError> {
        assert_eq!(from, ACCOUNT);
        let hash = hash_of(transaction);
        self.log.push(format!("send {hash}"));
        Ok(hash)
    }
}

#[derive(Debug)]
pub struct FakeSequence {
    pub chain_id: ChainId,
    pub log: EventLog,
}

#[async_trait]
impl SequenceWallet for FakeSequence {
    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        Ok(self.chain_id)
    }

    async fn send_transactions(
        &self,
        transactions: &[Transaction],
        _chain_id: ChainId,
    ) -> Result<B256, WalletError> {
        self.log.push(format!("send batch {}", transactions.len()));
        transactions
            .last()
            .map(hash_of)
            .ok_or(WalletError::Backend("empty batch".into()))
    }
}

#[derive(Debug)]
pub struct FakeWaas {
    pub chain_id: ChainId,
    pub quote: WaasFeeOptions,
    /// Replaces the default successful receipt response.
    pub response: Option<WaasSendResponse>,
    pub sent: Mutex<Vec<WaasSendRequest>>,
    pub log: EventLog,
}

impl FakeWaas {
    pub fn new(chain_id: ChainId, fee_options: Vec<FeeOption>) -> Self {
        Self {
            chain_id,
            quote: WaasFeeOptions {
                fee_options,
                fee_quote: Some("quote-1".into()),
            },
            response: None,
            sent: Mutex::new(Vec::new()),
            log: EventLog::default(),
        }
    }
}

#[async_trait]
impl WaasWallet for FakeWaas {
    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        Ok(self.chain_id)
    }

    async fn fee_options(
        &self,
        _transactions: &[Transaction],
        _chain_id: ChainId,
    ) -> Result<WaasFeeOptions, WalletError> {
        self.log.push("fee options".into());
        Ok(self.quote.clone())
    }

    async fn send_transaction(
        &self,
        request: WaasSendRequest,
    ) -> Result<WaasSendResponse, WalletError> {
        self.log.push(format!("send batch {}", request.transactions.len()));
        let response = self.response.clone().unwrap_or_else(|| {
            let tx_hash = request.transactions.last().map(hash_of).unwrap_or_default();
            WaasSendResponse::TransactionReceipt { tx_hash }
        });
        self.sent.lock().unwrap().push(request);
        Ok(response)
    }
}
