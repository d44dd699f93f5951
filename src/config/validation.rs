//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, gas limits, multipliers)
//! - Check timeouts are consistent with each other
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;

use crate::config::schema::AppConfig;

/// Minimum gas of any Ethereum transaction.
const INTRINSIC_GAS: u64 = 21_000;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let chain = &config.blockchain;

    if chain.rpc_url.parse::<url::Url>().is_err() {
        errors.push(ValidationError::new(
            "blockchain.rpc_url",
            format!("'{}' is not a valid URL", chain.rpc_url),
        ));
    }
    if chain.chain_id == 0 {
        errors.push(ValidationError::new("blockchain.chain_id", "must be greater than 0"));
    }
    if chain.gas_limit < INTRINSIC_GAS {
        errors.push(ValidationError::new(
            "blockchain.gas_limit",
            format!("must be at least {}", INTRINSIC_GAS),
        ));
    }
    if chain.gas_price_multiplier.is_nan() || chain.gas_price_multiplier < 1.0 {
        errors.push(ValidationError::new(
            "blockchain.gas_price_multiplier",
            "must be at least 1.0",
        ));
    }
    if chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("blockchain.rpc_timeout_secs", "must be greater than 0"));
    }
    if chain.receipt_poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "blockchain.receipt_poll_interval_ms",
            "must be greater than 0",
        ));
    }
    if chain.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "blockchain.confirmation_timeout_secs",
            "must be greater than 0",
        ));
    }
    if let Some(address) = &chain.deployer_address {
        if address.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                "blockchain.deployer_address",
                format!("'{}' is not a valid address", address),
            ));
        }
    }
    if config.timeouts.request_secs <= chain.confirmation_timeout_secs {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than blockchain.confirmation_timeout_secs",
        ));
    }
    if config.coordination.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "coordination.poll_interval_ms",
            "must be greater than 0",
        ));
    }
    if config.coordination.max_wait_secs == 0 {
        errors.push(ValidationError::new("coordination.max_wait_secs", "must be greater than 0"));
    }
    if config.contract.address_file.trim().is_empty() {
        errors.push(ValidationError::new("contract.address_file", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
