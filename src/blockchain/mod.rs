//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key, RPC URL)
//!     → wallet.rs (key loading, signing)
//!     → client.rs (RPC connection with timeouts and failover)
//!     → nonce.rs (process-wide nonce critical section)
//!     → transaction.rs (sequence, sign, submit, confirm)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//!
//! # Concurrency
//! Only nonce and gas price fetching is serialized. Signing, submission and
//! receipt polling of different writes run concurrently. Nonce safety holds
//! within one process only; a fleet must route writes through one replica.

pub mod client;
pub mod nonce;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{ChainClient, RpcChainClient};
pub use transaction::{PipelineConfig, TransactionPipeline, TxCall};
pub use types::{
    BlockchainConfig, BlockchainError, ChainId, ReceiptStatus, ReceiptSummary,
    TransactionOutcome, TxError,
};
pub use wallet::Wallet;
