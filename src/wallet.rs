//! Signer seam for the executor: the subset of EIP-1193 requests it needs,
//! plus a local private-key implementation backed by per-chain RPC URLs.

use crate::config::Config;
use crate::error::SignerError;
use crate::registry::AddChainParams;
use crate::rpc::{get_transaction_receipt, RpcClient};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// `eth_sendTransaction` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxParams {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: Option<U256>,
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn chain_id(&self) -> Result<u64, SignerError>;

    /// `wallet_switchEthereumChain`. Unknown chains fail with
    /// [`SignerError::UnrecognizedChain`].
    async fn switch_chain(&self, chain_id: u64) -> Result<(), SignerError>;

    /// `wallet_addEthereumChain`.
    async fn add_chain(&self, params: &AddChainParams) -> Result<(), SignerError>;

    /// Currently authorized accounts, unvalidated, as the wallet reports them.
    async fn accounts(&self) -> Result<Vec<String>, SignerError>;

    async fn send_transaction(&self, tx: TxParams) -> Result<B256, SignerError>;

    /// `Some(success)` once mined, `None` while unknown to the node.
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<bool>, SignerError>;
}

/// Signs locally and broadcasts through the RPC URL of the active chain.
pub struct LocalWallet {
    signer: PrivateKeySigner,
    rpc_urls: RwLock<BTreeMap<u64, String>>,
    active_chain: AtomicU64,
}

impl LocalWallet {
    pub fn new(signer: PrivateKeySigner, rpc_urls: BTreeMap<u64, String>, chain_id: u64) -> Self {
        Self {
            signer,
            rpc_urls: RwLock::new(rpc_urls),
            active_chain: AtomicU64::new(chain_id),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    async fn active_rpc_url(&self) -> Result<String, SignerError> {
        let chain_id = self.active_chain.load(Ordering::SeqCst);
        self.rpc_urls
            .read()
            .await
            .get(&chain_id)
            .cloned()
            .ok_or(SignerError::UnrecognizedChain(chain_id))
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn chain_id(&self) -> Result<u64, SignerError> {
        Ok(self.active_chain.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), SignerError> {
        if !self.rpc_urls.read().await.contains_key(&chain_id) {
            return Err(SignerError::UnrecognizedChain(chain_id));
        }
        self.active_chain.store(chain_id, Ordering::SeqCst);
        tracing::debug!(chain_id, "switched active chain");
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), SignerError> {
        let chain_id = parse_hex_chain_id(&params.chain_id)
            .ok_or_else(|| SignerError::Rejected(format!("invalid chain id {}", params.chain_id)))?;
        let rpc = params
            .rpc_urls
            .first()
            .ok_or_else(|| SignerError::Rejected(format!("no rpc url for chain {chain_id}")))?;
        self.rpc_urls.write().await.insert(chain_id, rpc.clone());
        tracing::info!(chain_id, name = %params.chain_name, "added chain");
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<String>, SignerError> {
        Ok(vec![format!("{:#x}", self.signer.address())])
    }

    async fn send_transaction(&self, tx: TxParams) -> Result<B256, SignerError> {
        let url = self.active_rpc_url().await?;
        let url = url::Url::parse(&url)
            .map_err(|err| SignerError::Unavailable(format!("invalid rpc url {url}: {err}")))?;
        let provider = ProviderBuilder::new()
            .wallet(self.signer.clone())
            .connect_http(url);

        let request = TransactionRequest {
            from: Some(tx.from),
            to: Some(tx.to.into()),
            input: TransactionInput::new(tx.data),
            value: tx.value,
            ..Default::default()
        };
        let pending = provider
            .send_transaction(request)
            .await
            .map_err(|err| SignerError::Rpc(err.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<bool>, SignerError> {
        let url = self.active_rpc_url().await?;
        let client = RpcClient::new(&url).map_err(|err| SignerError::Unavailable(err.to_string()))?;
        let receipt = get_transaction_receipt(&client, hash)
            .await
            .map_err(|err| SignerError::Rpc(format!("{err:#}")))?;
        Ok(receipt.map(|receipt| receipt.status()))
    }
}

fn parse_hex_chain_id(value: &str) -> Option<u64> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

pub struct SignerOptions<'a> {
    pub private_key: Option<&'a str>,
    pub private_key_env: Option<&'a str>,
}

/// Resolve the signing key from a flag or the configured environment variable.
pub fn load_signer(options: SignerOptions<'_>, config: &Config) -> Result<Option<PrivateKeySigner>> {
    if options.private_key.is_some() && options.private_key_env.is_some() {
        anyhow::bail!("cannot set both --private-key and --private-key-env");
    }
    if let Some(key) = options.private_key {
        return parse_private_key(key).map(Some);
    }

    let env = options
        .private_key_env
        .map(str::to_string)
        .unwrap_or_else(|| config.signer_env());
    match std::env::var(&env) {
        Ok(key) if !key.trim().is_empty() => parse_private_key(&key).map(Some),
        _ => Ok(None),
    }
}

fn parse_private_key(key: &str) -> Result<PrivateKeySigner> {
    key.trim()
        .parse()
        .map_err(|err| anyhow!("invalid private key: {err}"))
}
