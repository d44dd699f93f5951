//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, reason: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, reason } => write!(f, "Invalid {}: {}", var, reason),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the environment-style inputs on top of the file configuration.
///
/// `lookup` abstracts `std::env::var` so overrides can be tested without
/// touching the process environment.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("HARDHAT_URL") {
        config.blockchain.rpc_url = url;
    }
    if let Some(raw) = lookup("NETWORK_ID") {
        config.blockchain.chain_id = parse_number("NETWORK_ID", &raw)?;
    }
    if let Some(raw) = lookup("GAS_LIMIT") {
        config.blockchain.gas_limit = parse_number("GAS_LIMIT", &raw)?;
    }
    if let Some(address) = lookup("DEPLOYMENT_ADDRESS") {
        config.blockchain.deployer_address = Some(address);
    }
    if let Some(raw) = lookup("API_DEPLOYER") {
        config.coordination.deployer = parse_flag("API_DEPLOYER", &raw)?;
    }
    if let Some(path) = lookup("CONTRACT_ADDRESS_FILE") {
        config.contract.address_file = path;
    }
    if let Some(path) = lookup("CONTRACT_ARTIFACT") {
        config.contract.artifact_path = path;
    }
    if let Some(raw) = lookup("SEED_DEMO_DATA") {
        config.seeding.enabled = parse_flag("SEED_DEMO_DATA", &raw)?;
    }
    Ok(())
}

fn parse_number(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
        var,
        reason: e.to_string(),
    })
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ConfigError::Env {
            var,
            reason: format!("expected true or false, got '{}'", other),
        }),
    }
}
