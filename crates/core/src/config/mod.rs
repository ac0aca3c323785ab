//! Relayer configuration.
//!
//! One TOML file enumerates source and destination chains and, per source
//! chain, the message-protocol contracts to observe with their per-protocol
//! settings.

mod error;
pub use error::ConfigError;

use alloy_primitives::{Address, ChainId};
use courier_types::PartitionKey;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf};
use url::Url;

/// Top-level relayer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory the checkpoint store writes to.
    pub storage_dir: PathBuf,
    /// Endpoint of the attestation aggregation service.
    pub attestation_url: Url,
    /// Source chains to observe.
    #[serde(default)]
    pub source_chains: Vec<SourceChainConfig>,
    /// Destination chains to deliver to.
    #[serde(default)]
    pub destination_chains: Vec<DestinationChainConfig>,
}

/// One observed source chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceChainConfig {
    /// The chain ID.
    pub chain_id: ChainId,
    /// RPC endpoint for block and log queries.
    pub rpc_url: Url,
    /// Height to start from when no checkpoint exists. Defaults to 0, which
    /// reprocesses from genesis.
    #[serde(default)]
    pub start_height: u64,
    /// Number of pipeline workers per partition.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Message-protocol contracts to observe, keyed by origin contract.
    #[serde(default)]
    pub message_contracts: HashMap<Address, ProtocolConfig>,
}

/// One delivery target chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationChainConfig {
    /// The chain ID.
    pub chain_id: ChainId,
    /// RPC endpoint for delivered-queries and transaction submission.
    pub rpc_url: Url,
    /// The gateway contract delivered-queries are issued against.
    pub gateway_address: Address,
    /// Hex-encoded private key of the delivery account.
    pub account_private_key: String,
}

/// Per-origin-contract protocol selection and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// The wire format the contract emits.
    pub format: ProtocolFormat,
    /// Protocol settings.
    #[serde(default)]
    pub settings: ProtocolSettings,
}

/// Supported message wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolFormat {
    /// The native courier message format.
    Native,
}

/// Settings shared by protocol implementations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolSettings {
    /// Address credited for performed deliveries.
    #[serde(default)]
    pub reward_address: Option<Address>,
    /// Gas limit for delivery transactions.
    #[serde(default)]
    pub gas_limit: Option<u64>,
}

const fn default_workers() -> usize {
    4
}

impl Config {
    /// Loads and parses the configuration file at `path`.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints. Misconfiguration is fatal at
    /// startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_chains.is_empty() {
            return Err(ConfigError::NoSourceChains);
        }
        if self.destination_chains.is_empty() {
            return Err(ConfigError::NoDestinationChains);
        }

        let mut seen = std::collections::HashSet::new();
        for source in &self.source_chains {
            if !seen.insert(source.chain_id) {
                return Err(ConfigError::DuplicateChain(source.chain_id));
            }
            if source.message_contracts.is_empty() {
                return Err(ConfigError::NoMessageContracts(source.chain_id));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for destination in &self.destination_chains {
            if !seen.insert(destination.chain_id) {
                return Err(ConfigError::DuplicateChain(destination.chain_id));
            }
        }
        Ok(())
    }

    /// Enumerates every relay route implied by the configuration: each
    /// source chain crossed with each destination chain, with wildcard
    /// sender/recipient addresses.
    pub fn partition_keys(&self) -> Vec<PartitionKey> {
        let mut keys = Vec::new();
        for source in &self.source_chains {
            for destination in &self.destination_chains {
                if source.chain_id == destination.chain_id {
                    continue;
                }
                keys.push(PartitionKey::new(
                    source.chain_id,
                    destination.chain_id,
                    Address::ZERO,
                    Address::ZERO,
                ));
            }
        }
        keys
    }

    /// The source-chain entry for `chain_id`, if configured.
    pub fn source_chain(&self, chain_id: ChainId) -> Option<&SourceChainConfig> {
        self.source_chains.iter().find(|source| source.chain_id == chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn example_toml() -> String {
        r#"
            storage_dir = "/var/lib/courier"
            attestation_url = "http://localhost:8080/attest"

            [[source_chains]]
            chain_id = 1
            rpc_url = "http://localhost:8545"
            start_height = 100

            [source_chains.message_contracts.0x00000000000000000000000000000000000000cc]
            format = "native"
            settings = { reward_address = "0x00000000000000000000000000000000000000ee", gas_limit = 300000 }

            [[destination_chains]]
            chain_id = 2
            rpc_url = "http://localhost:9545"
            gateway_address = "0x00000000000000000000000000000000000000dd"
            account_private_key = "deadbeef"
        "#
        .to_string()
    }

    #[test]
    fn test_parse_example() {
        let config: Config = toml::from_str(&example_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.source_chains.len(), 1);
        let source = &config.source_chains[0];
        assert_eq!(source.start_height, 100);
        assert_eq!(source.workers, 4);
        let protocol = source
            .message_contracts
            .get(&address!("00000000000000000000000000000000000000cc"))
            .unwrap();
        assert_eq!(protocol.format, ProtocolFormat::Native);
        assert_eq!(protocol.settings.gas_limit, Some(300_000));
    }

    #[test]
    fn test_validate_rejects_empty_sources() {
        let mut config: Config = toml::from_str(&example_toml()).unwrap();
        config.source_chains.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoSourceChains)));
    }

    #[test]
    fn test_validate_rejects_duplicate_chain() {
        let mut config: Config = toml::from_str(&example_toml()).unwrap();
        config.source_chains.push(config.source_chains[0].clone());
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateChain(1))));
    }

    #[test]
    fn test_validate_rejects_source_without_contracts() {
        let mut config: Config = toml::from_str(&example_toml()).unwrap();
        config.source_chains[0].message_contracts.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoMessageContracts(1))));
    }

    #[test]
    fn test_partition_keys_cross_product_skips_self() {
        let mut config: Config = toml::from_str(&example_toml()).unwrap();
        let mut extra = config.source_chains[0].clone();
        extra.chain_id = 2;
        config.source_chains.push(extra);

        let keys = config.partition_keys();
        // source 1 -> dest 2; source 2 -> dest 2 is skipped as self-relay
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].source_chain_id, 1);
        assert_eq!(keys[0].destination_chain_id, 2);
    }
}
