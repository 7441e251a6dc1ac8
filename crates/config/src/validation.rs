//! Configuration validation

use crate::{AppConfig, BatchingConfig, ChainConfig, ConfigError, Environment, Result};
use cow_operator_matching_engine::MAX_PARTITION_TASKS;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    if let Err(e) = validate_log_level(&config.network.log_level) {
        errors.push(e);
    }

    errors.extend(validate_chain_config(&config.chain));
    errors.extend(validate_batching_config(&config.batching));

    // Local devnets may run before contracts are deployed
    if config.network.environment != Environment::Local {
        let contracts = [
            ("contracts.service_manager", config.contracts.service_manager),
            ("contracts.hook", config.contracts.hook),
            ("contracts.quoter", config.contracts.quoter),
        ];
        for (field, address) in contracts {
            if address.is_zero() {
                errors.push(ValidationError::new(field, "address is required"));
            }
        }
    }

    if config.operator.private_key_env.is_empty() {
        errors.push(ValidationError::new(
            "operator.private_key_env",
            "key variable name is required",
        ));
    }

    if !errors.is_empty() {
        let error_msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::ValidationError(error_msg));
    }

    Ok(())
}

/// Validate the chain connection
pub fn validate_chain_config(chain: &ChainConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if chain.chain_id == 0 {
        errors.push(ValidationError::new("chain.chain_id", "must be greater than 0"));
    }

    if let Err(e) = validate_url(&chain.rpc_url) {
        errors.push(ValidationError::new("chain.rpc_url", e));
    }

    if let Some(ws_url) = &chain.ws_url {
        if let Err(e) = validate_url(ws_url) {
            errors.push(ValidationError::new("chain.ws_url", e));
        }
    }

    if chain.polling_interval_ms == 0 {
        errors.push(ValidationError::new(
            "chain.polling_interval_ms",
            "must be greater than 0",
        ));
    }

    if chain.timeout_ms == 0 {
        errors.push(ValidationError::new("chain.timeout_ms", "must be greater than 0"));
    }

    errors
}

/// Validate batch window and matching limits
pub fn validate_batching_config(batching: &BatchingConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if batching.max_blocks_per_batch == 0 {
        errors.push(ValidationError::new(
            "batching.max_blocks_per_batch",
            "must be greater than 0",
        ));
    }

    if batching.max_tasks_per_batch == 0 || batching.max_tasks_per_batch > MAX_PARTITION_TASKS {
        errors.push(ValidationError::new(
            "batching.max_tasks_per_batch",
            format!("must be between 1 and {MAX_PARTITION_TASKS}"),
        ));
    }

    if batching.status_history == 0 {
        errors.push(ValidationError::new(
            "batching.status_history",
            "must be greater than 0",
        ));
    }

    if batching.seen_task_capacity < batching.max_tasks_per_batch {
        errors.push(ValidationError::new(
            "batching.seen_task_capacity",
            "must be at least batching.max_tasks_per_batch",
        ));
    }

    errors
}

/// Validate a URL
pub fn validate_url(url: &str) -> std::result::Result<(), String> {
    if url.is_empty() {
        return Err("URL cannot be empty".to_string());
    }

    // Basic URL validation - check for scheme
    if !url.starts_with("http://")
        && !url.starts_with("https://")
        && !url.starts_with("ws://")
        && !url.starts_with("wss://")
    {
        return Err("URL must start with http://, https://, ws://, or wss://".to_string());
    }

    Ok(())
}

/// Validate log level
fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "network.log_level",
            format!(
                "invalid log level '{level}', must be one of: trace, debug, info, warn, error"
            ),
        )),
    }
}
