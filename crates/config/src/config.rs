//! Core configuration structures for the CoW matching operator

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Network configuration
    pub network: NetworkConfig,

    /// Chain connection
    #[serde(default)]
    pub chain: ChainConfig,

    /// Deployed contract addresses
    #[serde(default)]
    pub contracts: ContractsConfig,

    /// Operator identity
    #[serde(default)]
    pub operator: OperatorConfig,

    /// Batch window and matching limits
    #[serde(default)]
    pub batching: BatchingConfig,
}

/// Network environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Environment type (mainnet, testnet, local)
    pub environment: Environment,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Enable metrics collection
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Mainnet,
    Testnet,
    Local,
}

/// Connection to the chain hosting the pool and the service manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// EVM chain id
    pub chain_id: u64,

    /// HTTP RPC endpoint
    pub rpc_url: String,

    /// Websocket endpoint for event subscriptions (optional)
    #[serde(default)]
    pub ws_url: Option<String>,

    /// Block and event polling interval in milliseconds
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Addresses of the contracts the operator talks to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Service manager accepting batch responses
    pub service_manager: Address,

    /// Hook contract that receives and settles swap intents
    pub hook: Address,

    /// Quoter used to price each task against the pool
    pub quoter: Address,
}

/// Operator identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Environment variable holding the hex-encoded signing key
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
}

/// Batch window and matching limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Blocks a batch stays open before it is closed and processed
    #[serde(default = "default_max_blocks_per_batch")]
    pub max_blocks_per_batch: u64,

    /// Largest slice of tasks searched at once
    #[serde(default = "default_max_tasks_per_batch")]
    pub max_tasks_per_batch: usize,

    /// Terminal batch statuses kept for inspection
    #[serde(default = "default_status_history")]
    pub status_history: usize,

    /// Accepted task ids remembered to reject redelivered tasks
    #[serde(default = "default_seen_task_capacity")]
    pub seen_task_capacity: usize,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_polling_interval_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_max_retries() -> u32 {
    3
}

fn default_private_key_env() -> String {
    "OPERATOR_PRIVATE_KEY".to_string()
}

fn default_max_blocks_per_batch() -> u64 {
    10
}

fn default_max_tasks_per_batch() -> usize {
    8
}

fn default_status_history() -> usize {
    256
}

fn default_seen_task_capacity() -> usize {
    65536
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Local,
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: default_true(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 31337,
            rpc_url: "http://localhost:8545".to_string(),
            ws_url: None,
            polling_interval_ms: default_polling_interval_ms(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            private_key_env: default_private_key_env(),
        }
    }
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_blocks_per_batch: default_max_blocks_per_batch(),
            max_tasks_per_batch: default_max_tasks_per_batch(),
            status_history: default_status_history(),
            seen_task_capacity: default_seen_task_capacity(),
        }
    }
}
