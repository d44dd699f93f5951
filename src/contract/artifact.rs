//! Compiled contract artifact loading.
//!
//! Accepts the JSON shapes produced by the common toolchains:
//! - Hardhat: `{"abi": [...], "bytecode": "0x..."}`
//! - Foundry / solc standard JSON: `{"abi": [...], "bytecode": {"object": "..."}}`

use alloy::json_abi::JsonAbi;
use alloy::primitives::{hex, Bytes};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::blockchain::TxCall;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Artifact has no {0}")]
    Missing(&'static str),

    #[error("Invalid bytecode: {0}")]
    InvalidBytecode(String),
}

#[derive(Deserialize)]
struct RawArtifact {
    #[serde(rename = "contractName")]
    contract_name: Option<String>,
    abi: Option<JsonAbi>,
    bytecode: Option<RawBytecode>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

/// Interface description and creation code of the ledger contract.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub name: Option<String>,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = Self::from_json(&content)?;

        tracing::info!(
            path = %path.display(),
            contract = artifact.name.as_deref().unwrap_or("unknown"),
            functions = artifact.abi.functions().count(),
            bytecode_len = artifact.bytecode.len(),
            "Contract artifact loaded"
        );
        Ok(artifact)
    }

    pub fn from_json(content: &str) -> Result<Self, ArtifactError> {
        let raw: RawArtifact = serde_json::from_str(content)?;

        let abi = raw.abi.ok_or(ArtifactError::Missing("abi"))?;
        let code = match raw.bytecode.ok_or(ArtifactError::Missing("bytecode"))? {
            RawBytecode::Hex(code) => code,
            RawBytecode::Object { object } => object,
        };

        let bytecode = hex::decode(code.trim())
            .map_err(|e| ArtifactError::InvalidBytecode(e.to_string()))?;
        if bytecode.is_empty() {
            return Err(ArtifactError::InvalidBytecode("bytecode is empty".to_string()));
        }

        Ok(Self {
            name: raw.contract_name,
            abi,
            bytecode: bytecode.into(),
        })
    }

    /// Contract-creation call for the pipeline.
    pub fn deploy_call(&self) -> TxCall {
        TxCall::Deploy {
            code: self.bytecode.clone(),
        }
    }
}
