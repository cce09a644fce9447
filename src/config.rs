use crate::executor::{
    ExecutorOptions, DEFAULT_BRIDGE_TIMEOUT, DEFAULT_RECEIPT_ATTEMPTS, DEFAULT_RECEIPT_POLL,
};
use crate::registry::{ChainInfo, CHAINS};
use crate::tracker::TrackerSettings;
use crate::types::{parse_address, Chain};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Keyed by chain tag (`ETH`, `BSC`, `ZetaChain`).
    pub chains: Option<BTreeMap<String, ChainConfig>>,
    pub tracker: Option<TrackerConfig>,
    pub planner: Option<PlannerConfig>,
    pub executor: Option<ExecutorConfig>,
    pub signer: Option<SignerConfig>,
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(skip)]
    pub env: EnvOverrides,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ChainConfig {
    pub rpc: String,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct TrackerConfig {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub proxy: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct PlannerConfig {
    pub batch_executor: Option<String>,
    pub allow_unsupported: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ExecutorConfig {
    pub bridge_timeout_secs: Option<u64>,
    pub receipt_poll_ms: Option<u64>,
    pub receipt_attempts: Option<u32>,
    pub history_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct SignerConfig {
    pub private_key_env: Option<String>,
}

/// Environment variables, captured once at load time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvOverrides {
    pub batch_executor: Option<String>,
    pub zeta_rpc: Option<String>,
    pub sepolia_rpc: Option<String>,
    pub bsc_rpc: Option<String>,
    pub tracker_api: Option<String>,
}

impl EnvOverrides {
    pub fn from_process() -> Self {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            batch_executor: read("ZETACHAIN_BATCH_EXECUTOR"),
            zeta_rpc: read("ZETACHAIN_RPC_URL"),
            sepolia_rpc: read("SEPOLIA_RPC_URL"),
            bsc_rpc: read("BSC_TESTNET_RPC_URL"),
            tracker_api: read("ZETA_TESTNET_API_URL"),
        }
    }

    fn rpc_for(&self, chain: Chain) -> Option<&String> {
        match chain {
            Chain::Eth => self.sepolia_rpc.as_ref(),
            Chain::Bsc => self.bsc_rpc.as_ref(),
            Chain::ZetaChain => self.zeta_rpc.as_ref(),
            Chain::Solana => None,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path(),
        };

        let mut config = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        } else {
            Self::default()
        };
        config.path = path;
        config.env = EnvOverrides::from_process();
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn signer_env(&self) -> String {
        self.signer
            .as_ref()
            .and_then(|cfg| cfg.private_key_env.clone())
            .unwrap_or_else(|| "PRIVATE_KEY".to_string())
    }

    /// Environment, then config file, then the registry default.
    pub fn rpc_for(&self, info: &ChainInfo) -> String {
        if let Some(url) = self.env.rpc_for(info.chain) {
            return url.clone();
        }
        self.chains
            .as_ref()
            .and_then(|chains| {
                chains
                    .iter()
                    .find(|(tag, _)| tag.eq_ignore_ascii_case(info.chain.tag()))
            })
            .map(|(_, cfg)| cfg.rpc.clone())
            .unwrap_or_else(|| info.rpc_url.to_string())
    }

    /// Resolved RPC URL per registered chain id.
    pub fn chain_rpcs(&self) -> BTreeMap<u64, String> {
        CHAINS
            .iter()
            .map(|info| (info.chain_id, self.rpc_for(info)))
            .collect()
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        let defaults = TrackerSettings::default();
        let file = self.tracker.clone().unwrap_or_default();
        TrackerSettings {
            api_url: self
                .env
                .tracker_api
                .clone()
                .or(file.api_url)
                .unwrap_or(defaults.api_url),
            request_timeout: file
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            poll_interval: file
                .poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            proxy: file.proxy,
        }
    }

    pub fn batch_executor(&self) -> Result<Option<Address>> {
        let value = self.env.batch_executor.clone().or_else(|| {
            self.planner
                .as_ref()
                .and_then(|planner| planner.batch_executor.clone())
        });
        value
            .map(|value| parse_address(&value).context("invalid batch executor address"))
            .transpose()
    }

    pub fn allow_unsupported(&self) -> bool {
        self.planner
            .as_ref()
            .and_then(|planner| planner.allow_unsupported)
            .unwrap_or(false)
    }

    pub fn executor_options(&self) -> ExecutorOptions {
        let file = self.executor.clone().unwrap_or_default();
        ExecutorOptions {
            bridge_timeout: file
                .bridge_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_BRIDGE_TIMEOUT),
            receipt_poll: file
                .receipt_poll_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_RECEIPT_POLL),
            receipt_attempts: file.receipt_attempts.unwrap_or(DEFAULT_RECEIPT_ATTEMPTS),
            chain_rpcs: self.chain_rpcs(),
        }
    }

    pub fn history_path(&self) -> PathBuf {
        if let Some(path) = self
            .executor
            .as_ref()
            .and_then(|executor| executor.history_path.clone())
        {
            return path;
        }
        match dirs::data_dir() {
            Some(dir) => dir.join("zeta-planner").join("history.json"),
            None => PathBuf::from("./history.json"),
        }
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dir) = dirs::config_dir() {
        return dir.join("zeta-planner").join("config.toml");
    }
    PathBuf::from("./config.toml")
}
