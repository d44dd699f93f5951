//! Chain-specific types and error definitions.

use alloy::primitives::{Address, Bytes, TxHash};
use thiserror::Error;

// Re-export BlockchainConfig from config module to avoid duplication
pub use crate::config::schema::BlockchainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors raised by the chain client and the wallet.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// The node could not be reached, timed out, or failed a read call.
    #[error("RPC unavailable: {0}")]
    Unavailable(String),

    /// The node answered a submission with an error response.
    #[error("Transaction rejected by node: {0}")]
    Rejected(String),

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Call data could not be encoded or return data decoded.
    #[error("ABI error: {0}")]
    Abi(String),
}

/// Result type for chain client operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Failure kinds of the transaction pipeline.
#[derive(Debug, Error)]
pub enum TxError {
    /// Nonce or gas price could not be fetched.
    #[error("Chain unavailable: {0}")]
    ChainUnavailable(String),

    /// The node refused the signed transaction synchronously.
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    /// No receipt within the wait window. The transaction may still be mined later.
    #[error("Transaction {tx_hash} not confirmed after {waited_secs}s; its final status is unknown")]
    ConfirmationTimeout { tx_hash: TxHash, waited_secs: u64 },

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Building or signing the transaction failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Call data could not be built for the requested method.
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

impl TxError {
    /// Stable identifier used in API responses and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            TxError::ChainUnavailable(_) => "ChainUnavailable",
            TxError::SubmissionRejected(_) => "SubmissionRejected",
            TxError::ConfirmationTimeout { .. } => "ConfirmationTimeout",
            TxError::GasPriceTooHigh { .. } => "GasPriceTooHigh",
            TxError::Signing(_) => "SigningFailed",
            TxError::Encoding(_) => "EncodingFailed",
        }
    }

    pub(crate) fn unavailable(err: BlockchainError) -> Self {
        TxError::ChainUnavailable(err.to_string())
    }
}

/// Result type for pipeline operations.
pub type TxResult<T> = Result<T, TxError>;

/// The receipt fields the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
    pub contract_address: Option<Address>,
}

/// Final on-chain status of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Confirmed,
    Failed,
}

/// Terminal result of a pipeline submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub tx_hash: TxHash,
    pub status: ReceiptStatus,
    pub block_number: Option<u64>,
    /// Set only for contract creation.
    pub contract_address: Option<Address>,
}

impl TransactionOutcome {
    pub fn is_confirmed(&self) -> bool {
        self.status == ReceiptStatus::Confirmed
    }
}

impl From<ReceiptSummary> for TransactionOutcome {
    fn from(receipt: ReceiptSummary) -> Self {
        Self {
            tx_hash: receipt.tx_hash,
            status: if receipt.success {
                ReceiptStatus::Confirmed
            } else {
                ReceiptStatus::Failed
            },
            block_number: receipt.block_number,
            contract_address: receipt.contract_address,
        }
    }
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub tx_hash: TxHash,
    pub raw: Bytes,
}
