//! TOML configuration file for `chainwatch run`.
//!
//! ```toml
//! rpc_url = "http://localhost:8545"
//!
//! [watcher]
//! from_block = 19000000
//! confirmation_latency = 2
//! chunk_size = 100
//!
//! [log]
//! level = "info"
//!
//! [[contracts]]
//! contract_type = "ERC20_TOKEN"
//! addresses = ["0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"]
//! event_signatures = ["Transfer(address indexed from, address indexed to, uint256 value)"]
//! abi_path = "abis/erc20.json"
//! ```
//!
//! `CHAINWATCH_RPC_URL` overrides `rpc_url`. Relative `abi_path`s resolve
//! against the directory holding the config file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use alloy_json_abi::JsonAbi;
use chainwatch_core::{ContractRegistration, WatcherConfig};
use chainwatch_evm::abi;

use crate::logging::LogConfig;

pub const RPC_URL_ENV: &str = "CHAINWATCH_RPC_URL";

#[derive(Debug, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub rpc_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub contracts: Vec<ContractConfig>,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// One `[[contracts]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    pub contract_type: String,
    pub addresses: Vec<String>,
    /// Defaults to every non-anonymous event in the ABI.
    #[serde(default)]
    pub event_signatures: Vec<String>,
    pub abi_path: PathBuf,
}

impl ContractConfig {
    pub fn load_abi(&self) -> Result<JsonAbi> {
        abi::load_abi(&self.abi_path)
            .with_context(|| format!("contract type {}", self.contract_type))
    }

    pub fn registration(&self, abi: JsonAbi) -> ContractRegistration<JsonAbi> {
        let signatures = if self.event_signatures.is_empty() {
            abi::event_signatures(&abi)
        } else {
            self.event_signatures.clone()
        };
        ContractRegistration::new(self.contract_type.clone(), abi)
            .addresses(&self.addresses)
            .event_signatures(signatures)
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut cfg = Self::parse(&text, base)?;
        if let Ok(url) = std::env::var(RPC_URL_ENV) {
            cfg.rpc_url = url;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse TOML text; relative ABI paths are joined onto `base`.
    pub fn parse(text: &str, base: &Path) -> Result<Self> {
        let mut cfg: Self = toml::from_str(text).context("invalid config")?;
        for contract in &mut cfg.contracts {
            if contract.abi_path.is_relative() {
                contract.abi_path = base.join(&contract.abi_path);
            }
        }
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            bail!("rpc_url is not set (config or {RPC_URL_ENV})");
        }
        if self.contracts.is_empty() {
            bail!("no [[contracts]] configured");
        }
        for contract in &self.contracts {
            if contract.addresses.is_empty() {
                bail!("contract type {} has no addresses", contract.contract_type);
            }
        }
        self.watcher.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
rpc_url = "http://localhost:8545"

[watcher]
from_block = 100
confirmation_latency = 2
chunk_size = 50

[log]
level = "debug"
json = true

[[contracts]]
contract_type = "ERC20_TOKEN"
addresses = ["0xAAA"]
event_signatures = ["Transfer(address,address,uint256)"]
abi_path = "abis/erc20.json"

[[contracts]]
contract_type = "PAIR"
addresses = ["0xbbb", "0xccc"]
abi_path = "/opt/abis/pair.json"
"#;

    #[test]
    fn parses_full_config() {
        let cfg = FileConfig::parse(SAMPLE, Path::new("/etc/chainwatch")).unwrap();
        assert_eq!(cfg.rpc_url, "http://localhost:8545");
        assert_eq!(cfg.request_timeout_ms, 30_000);
        assert_eq!(cfg.watcher.from_block, 100);
        assert_eq!(cfg.watcher.effective_chunk_size(), 50);
        assert_eq!(cfg.watcher.poll_interval_ms, 1_000);
        assert_eq!(cfg.log.level, "debug");
        assert!(cfg.log.json);
        assert_eq!(cfg.contracts.len(), 2);
        assert_eq!(
            cfg.contracts[0].abi_path,
            PathBuf::from("/etc/chainwatch/abis/erc20.json")
        );
        assert_eq!(cfg.contracts[1].abi_path, PathBuf::from("/opt/abis/pair.json"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_sections_use_defaults() {
        let cfg = FileConfig::parse(r#"rpc_url = "http://x""#, Path::new(".")).unwrap();
        assert_eq!(cfg.watcher, WatcherConfig::default());
        assert_eq!(cfg.log.level, "info");
        assert!(cfg.validate().is_err(), "no contracts configured");
    }

    #[test]
    fn contract_without_addresses_is_rejected() {
        let text = r#"
rpc_url = "http://x"
[[contracts]]
contract_type = "T"
addresses = []
abi_path = "t.json"
"#;
        let cfg = FileConfig::parse(text, Path::new(".")).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn registration_defaults_to_abi_events() {
        let abi = abi::parse_abi(
            r#"[{"type":"event","name":"Sync","anonymous":false,"inputs":[
                {"name":"reserve0","type":"uint112","indexed":false},
                {"name":"reserve1","type":"uint112","indexed":false}]}]"#,
        )
        .unwrap();
        let cfg = FileConfig::parse(SAMPLE, Path::new(".")).unwrap();

        let reg = cfg.contracts[1].registration(abi);
        assert_eq!(reg.contract_type, "PAIR");
        assert_eq!(reg.addresses.len(), 2);
        assert_eq!(
            reg.event_signatures.iter().collect::<Vec<_>>(),
            ["Sync(uint112,uint112)"]
        );
    }
}
