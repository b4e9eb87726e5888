use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::wallet::guard::NetworkGuard;
use crate::wallet::types::{Address, ChainId, WalletKind};

pub const ENV_CHAIN_ID: &str = "CHAINMATE_CHAIN_ID";
pub const ENV_NETWORK_NAME: &str = "CHAINMATE_NETWORK_NAME";
pub const ENV_CONTRACT_ADDRESS: &str = "CHAINMATE_CONTRACT_ADDRESS";
pub const ENV_RPC_URL: &str = "CHAINMATE_RPC_URL";
pub const ENV_DATA_DIR: &str = "CHAINMATE_DATA_DIR";
pub const ENV_RESTORE_SESSION: &str = "CHAINMATE_RESTORE_SESSION";
pub const ENV_WALLET_KIND: &str = "CHAINMATE_WALLET_KIND";

/// What to do with a wallet snapshot left in storage by a previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestorePolicy {
    /// Clear it; the user reconnects explicitly.
    #[default]
    Discard,
    /// Keep it as a display hint until the provider re-confirms.
    Advisory,
}

impl FromStr for RestorePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(RestorePolicy::Discard),
            "advisory" => Ok(RestorePolicy::Advisory),
            other => bail!("unknown session restore policy '{}' (expected discard or advisory)", other),
        }
    }
}

/// Expected network and game contract. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub expected_chain_id: Option<String>,
    pub network_name: Option<String>,
    pub contract_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub restore: RestorePolicy,
}

/// How long to wait for a submitted transaction to be mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptPolicy {
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_polls: 30,
        }
    }
}

impl ReceiptPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the SQLite database
    pub data_dir: PathBuf,
    /// JSON-RPC endpoint used as the wallet provider by the CLI
    pub rpc_url: String,
    /// Wallet implementation the locator must find
    pub wallet_kind: WalletKind,
    /// Poll interval for account/chain changes on the RPC endpoint
    pub watch_interval_ms: u64,
    pub chain: ChainConfig,
    pub session: SessionConfig,
    pub retry: RetryPolicy,
    pub receipts: ReceiptPolicy,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = Self::default_data_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            data_dir,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            wallet_kind: WalletKind::MetaMask,
            watch_interval_ms: 2000,
            chain: ChainConfig::default(),
            session: SessionConfig::default(),
            retry: RetryPolicy::default(),
            receipts: ReceiptPolicy::default(),
        }
    }
}

impl Config {
    pub fn default_data_dir() -> Result<PathBuf> {
        ProjectDirs::from("dev", "chainmate", "chainmate")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
    }

    pub fn default_config_file() -> Result<PathBuf> {
        ProjectDirs::from("dev", "chainmate", "chainmate")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    /// Load the config file (when present), apply environment overrides and
    /// validate. Read once at startup.
    pub fn load() -> Result<Self> {
        let path = Self::default_config_file()?;
        Self::load_with(Some(&path), |key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load) with an explicit file and environment lookup.
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Config::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        if let Some(chain_id) = lookup(ENV_CHAIN_ID) {
            self.chain.expected_chain_id = Some(chain_id);
        }
        if let Some(name) = lookup(ENV_NETWORK_NAME) {
            self.chain.network_name = Some(name);
        }
        if let Some(address) = lookup(ENV_CONTRACT_ADDRESS) {
            self.chain.contract_address = Some(address);
        }
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.rpc_url = url;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(kind) = lookup(ENV_WALLET_KIND) {
            self.wallet_kind = kind
                .parse()
                .with_context(|| format!("Invalid {}", ENV_WALLET_KIND))?;
        }
        if let Some(policy) = lookup(ENV_RESTORE_SESSION) {
            self.session.restore = policy
                .parse()
                .with_context(|| format!("Invalid {}", ENV_RESTORE_SESSION))?;
        }
        Ok(())
    }

    /// Reject present-but-malformed chain settings.
    pub fn validate(&self) -> Result<()> {
        self.network_guard().map(|_| ())
    }

    pub fn expected_chain_id(&self) -> Result<Option<ChainId>> {
        match non_empty(&self.chain.expected_chain_id) {
            None => Ok(None),
            Some(raw) => {
                let chain = ChainId::new(raw);
                if raw.trim().to_ascii_lowercase().starts_with("0x") && chain.as_u64().is_none() {
                    bail!("Invalid expected chain id '{}': not a hex number", raw);
                }
                if raw.trim().chars().any(char::is_whitespace) {
                    bail!("Invalid expected chain id '{}'", raw);
                }
                Ok(Some(chain))
            }
        }
    }

    pub fn contract_address(&self) -> Result<Option<Address>> {
        non_empty(&self.chain.contract_address)
            .map(|raw| {
                Address::parse(raw).with_context(|| format!("Invalid contract address '{}'", raw))
            })
            .transpose()
    }

    pub fn network_guard(&self) -> Result<NetworkGuard> {
        Ok(NetworkGuard::new(
            self.expected_chain_id()?,
            non_empty(&self.chain.network_name).map(str::to_string),
            self.contract_address()?,
        ))
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("chainmate.sqlite")
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
