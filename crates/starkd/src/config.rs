//! StarkNet network and client configuration

use crate::error::{Result, StarknetError};
use crate::types::ContractRef;
use serde::{Deserialize, Serialize};
use starkd_provider::{presets, ProviderConfig, RateLimitConfig};
use starknet_core::types::Felt;
use starknet_core::utils::cairo_short_string_to_felt;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// StarkNet mainnet chain ID (short string)
pub const MAINNET_CHAIN_ID: &str = "SN_MAIN";

/// StarkNet Sepolia chain ID (short string)
pub const SEPOLIA_CHAIN_ID: &str = "SN_SEPOLIA";

/// Legacy Goerli testnet chain ID (short string)
pub const TESTNET_CHAIN_ID: &str = "SN_GOERLI";

/// Known StarkNet networks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// StarkNet mainnet
    Mainnet,
    /// Sepolia testnet
    #[default]
    Sepolia,
    /// Legacy Goerli testnet
    Testnet,
}

impl Network {
    /// Returns the preset configuration for this network
    pub fn config(self) -> NetworkConfig {
        match self {
            Network::Mainnet => NetworkConfig::mainnet(),
            Network::Sepolia => NetworkConfig::sepolia(),
            Network::Testnet => NetworkConfig::testnet(),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "mainnet",
            Network::Sepolia => "sepolia",
            Network::Testnet => "testnet",
        };
        f.write_str(name)
    }
}

impl FromStr for Network {
    type Err = StarknetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "sepolia" => Ok(Network::Sepolia),
            "testnet" | "goerli" => Ok(Network::Testnet),
            other => Err(StarknetError::ConfigError(format!("unknown network '{other}'"))),
        }
    }
}

/// StarkNet network configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Which network this describes
    pub network: Network,
    /// Chain ID as a Cairo short string
    pub chain_id: String,
    /// JSON-RPC endpoint URLs
    pub rpc_endpoints: Vec<String>,
    /// Sequencer gateway base URL
    pub gateway_url: String,
    /// Block explorer URL
    pub explorer: String,
    /// Fee cap attached to signed invokes, in wei
    pub max_fee: u128,
    /// Client-side request throttling
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl NetworkConfig {
    /// StarkNet mainnet configuration
    pub fn mainnet() -> Self {
        NetworkConfig {
            network: Network::Mainnet,
            chain_id: MAINNET_CHAIN_ID.to_string(),
            rpc_endpoints: vec![presets::starknet_mainnet().url],
            gateway_url: "https://alpha-mainnet.starknet.io/gateway".to_string(),
            explorer: "https://starkscan.co".to_string(),
            max_fee: 1_000_000_000_000_000,
            rate_limit: None,
        }
    }

    /// Sepolia testnet configuration
    pub fn sepolia() -> Self {
        NetworkConfig {
            network: Network::Sepolia,
            chain_id: SEPOLIA_CHAIN_ID.to_string(),
            rpc_endpoints: vec![presets::starknet_sepolia().url],
            gateway_url: "https://alpha-sepolia.starknet.io/gateway".to_string(),
            explorer: "https://sepolia.starkscan.co".to_string(),
            max_fee: 1_000_000_000_000_000,
            rate_limit: None,
        }
    }

    /// Legacy Goerli testnet configuration
    pub fn testnet() -> Self {
        NetworkConfig {
            network: Network::Testnet,
            chain_id: TESTNET_CHAIN_ID.to_string(),
            rpc_endpoints: vec![
                "https://starknet-goerli.public.blastapi.io/rpc/v0_6".to_string()
            ],
            gateway_url: "https://alpha4.starknet.io/gateway".to_string(),
            explorer: "https://testnet.starkscan.co".to_string(),
            max_fee: 0,
            rate_limit: None,
        }
    }

    /// Returns the primary RPC endpoint
    pub fn primary_rpc(&self) -> &str {
        self.rpc_endpoints.first().map(|s| s.as_str()).unwrap_or("")
    }

    /// Replaces the RPC endpoints with a single URL
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_endpoints = vec![url.into()];
        self
    }

    /// Replaces the gateway URL
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    /// Throttles every client built from this configuration
    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimitConfig>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Provider configuration for the primary endpoint
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(self.primary_rpc()).with_rate_limit(self.rate_limit.clone())
    }

    /// Encodes the chain ID as a felt
    pub fn chain_id_felt(&self) -> Result<Felt> {
        cairo_short_string_to_felt(&self.chain_id)
            .map_err(|e| StarknetError::ConfigError(format!("chain id '{}': {e}", self.chain_id)))
    }

    /// Check if this is a testnet
    pub fn is_testnet(&self) -> bool {
        self.network != Network::Mainnet
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Network::default().config()
    }
}

/// What to do with a failed call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Return the error to the caller
    #[default]
    Surface,
    /// Log the error and complete without a result
    Silent,
}

impl ErrorMode {
    /// Applies the mode to the outcome of `operation`
    pub fn settle<T>(self, operation: &str, outcome: Result<T>) -> Result<Option<T>> {
        match (self, outcome) {
            (_, Ok(value)) => Ok(Some(value)),
            (ErrorMode::Surface, Err(e)) => Err(e),
            (ErrorMode::Silent, Err(e)) => {
                tracing::warn!(operation, error = %e, "Call failed, continuing without result");
                Ok(None)
            }
        }
    }
}

/// Contracts the browser session talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSet {
    /// Multi-token (ERC-1155 style) contract
    pub multi_token: ContractRef,
    /// Single-token (ERC-721 style) contract
    pub single_token: ContractRef,
    /// Fungible (ERC-20 style) token contract
    pub fungible_token: ContractRef,
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarkdConfig {
    /// Network to talk to
    #[serde(default)]
    pub network: Network,
    /// Overrides the network's RPC endpoint
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Overrides the network's gateway
    #[serde(default)]
    pub gateway_url: Option<String>,
    /// Session contracts
    #[serde(default)]
    pub contracts: ContractSet,
    /// Token used by the ERC-20 client
    #[serde(default)]
    pub erc20_contract: ContractRef,
    /// Failure handling for calls
    #[serde(default)]
    pub error_mode: ErrorMode,
    /// Client-side request throttling
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl StarkdConfig {
    /// Loads the configuration, falling back to defaults when the file is absent
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Writes the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Network configuration with overrides applied
    pub fn network_config(&self) -> NetworkConfig {
        let mut config = self.network.config();
        if let Some(url) = &self.rpc_url {
            config = config.with_rpc_url(url.clone());
        }
        if let Some(url) = &self.gateway_url {
            config = config.with_gateway_url(url.clone());
        }
        if self.rate_limit.is_some() {
            config = config.with_rate_limit(self.rate_limit.clone());
        }
        config
    }
}
