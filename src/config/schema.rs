//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the ledger API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Blockchain integration settings.
    pub blockchain: BlockchainConfig,

    /// Contract artifact and shared address file.
    pub contract: ContractConfig,

    /// Deployment coordination between replicas.
    pub coordination: CoordinationConfig,

    pub seeding: SeedingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Timeout configuration for HTTP requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    ///
    /// Must exceed the confirmation timeout, since write handlers wait for
    /// receipts.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 150 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Blockchain integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (31337 for a local Hardhat/Anvil node).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Expected deployer address. Checked against the private key when set.
    pub deployer_address: Option<String>,

    /// Gas limit of every transaction.
    pub gas_limit: u64,

    /// Gas price multiplier (1.0 = node price, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Receipt polling interval in milliseconds.
    pub receipt_poll_interval_ms: u64,

    /// How long a write waits for its receipt, in seconds.
    pub confirmation_timeout_secs: u64,

    /// Attempts to reach the node at startup before giving up.
    pub node_ready_attempts: u32,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 31337,
            rpc_timeout_secs: 10,
            deployer_address: None,
            gas_limit: 3_000_000,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
            receipt_poll_interval_ms: 500,
            confirmation_timeout_secs: 120,
            node_ready_attempts: 10,
        }
    }
}

/// Contract artifact and deployed address location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Compiled artifact (ABI + bytecode) JSON.
    pub artifact_path: String,

    /// File shared by all replicas holding the deployed address.
    pub address_file: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            artifact_path: "contracts/PostosAbastecimento.json".to_string(),
            address_file: "/app/contract_address.txt".to_string(),
        }
    }
}

/// Deployment coordination settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// This replica deploys the contract when no address is stored yet.
    /// Exactly one replica per fleet may set this.
    pub deployer: bool,

    /// How often a waiting replica checks the address file, in milliseconds.
    pub poll_interval_ms: u64,

    /// How long a waiting replica waits for the address, in seconds.
    pub max_wait_secs: u64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            deployer: false,
            poll_interval_ms: 2000,
            max_wait_secs: 600,
        }
    }
}

/// Demo data seeding.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SeedingConfig {
    /// Seed stations and reservations after this replica deployed the contract.
    pub enabled: bool,
}
