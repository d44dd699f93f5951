//! Contract binding: method name + arguments <-> call data.
//!
//! The binding holds only the interface description and the deployed
//! address, so one instance is shared read-only by every handler.

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes};
use thiserror::Error;

use crate::blockchain::{BlockchainError, ChainClient, TxCall};

/// Register a station: `adicionarPosto(string nome)`.
pub const ADD_STATION: &str = "adicionarPosto";
/// Create a reservation: `criarReserva(string cliente, string carro, string posto)`.
pub const CREATE_RESERVATION: &str = "criarReserva";
pub const LIST_STATIONS: &str = "listarPostos";
pub const LIST_RESERVATIONS: &str = "listarReservas";
pub const LIST_PAYMENTS: &str = "listarPagamentos";

/// Signatures the service calls; an artifact missing any of them is rejected.
pub const REQUIRED_SIGNATURES: [&str; 5] = [
    "adicionarPosto(string)",
    "criarReserva(string,string,string)",
    "listarPostos()",
    "listarReservas()",
    "listarPagamentos()",
];

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("Contract interface is missing: {}", .0.join(", "))]
    MissingMethods(Vec<String>),

    #[error("Unknown method {method} with {args} argument(s)")]
    UnknownMethod { method: String, args: usize },

    #[error("Failed to encode {method}: {reason}")]
    Encode { method: String, reason: String },

    #[error("Failed to decode {method} result: {reason}")]
    Decode { method: String, reason: String },

    #[error(transparent)]
    Chain(#[from] BlockchainError),
}

/// Ledger contract interface bound to its deployed address.
#[derive(Debug, Clone)]
pub struct ContractBinding {
    abi: JsonAbi,
    address: Address,
}

impl ContractBinding {
    pub fn new(abi: JsonAbi, address: Address) -> Result<Self, BindingError> {
        let missing: Vec<String> = REQUIRED_SIGNATURES
            .iter()
            .filter(|signature| {
                !abi.functions()
                    .any(|function| function.signature() == **signature)
            })
            .map(|signature| signature.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(BindingError::MissingMethods(missing));
        }

        Ok(Self { abi, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn function(&self, method: &str, args: usize) -> Result<&Function, BindingError> {
        self.abi
            .function(method)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == args))
            .ok_or_else(|| BindingError::UnknownMethod {
                method: method.to_string(),
                args,
            })
    }

    /// Selector followed by the ABI-encoded arguments.
    pub fn build(&self, method: &str, args: &[DynSolValue]) -> Result<Bytes, BindingError> {
        let function = self.function(method, args.len())?;
        function
            .abi_encode_input(args)
            .map(Bytes::from)
            .map_err(|e| BindingError::Encode {
                method: method.to_string(),
                reason: e.to_string(),
            })
    }

    /// Pipeline call for a state-changing method.
    pub fn transaction(&self, method: &str, args: &[DynSolValue]) -> Result<TxCall, BindingError> {
        Ok(TxCall::Invoke {
            to: self.address,
            method: method.to_string(),
            data: self.build(method, args)?,
        })
    }

    /// Read-only call; returns the decoded return values.
    pub async fn call(
        &self,
        client: &dyn ChainClient,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, BindingError> {
        let function = self.function(method, args.len())?;
        let data = self.build(method, args)?;

        let output = client.call(self.address, data).await?;

        function
            .abi_decode_output(&output)
            .map_err(|e| BindingError::Decode {
                method: method.to_string(),
                reason: e.to_string(),
            })
    }
}
