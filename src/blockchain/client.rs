//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoint (primary + failovers)
//! - Query chain state (nonce, gas price, block number, receipts)
//! - Submit raw signed transactions
//! - Handle timeouts and network errors gracefully

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{
    BlockchainConfig, BlockchainError, BlockchainResult, ChainId, ReceiptSummary,
};

/// Capability over a blockchain node used by the pipeline and the read layer.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Pending transaction count (next nonce) of `address`.
    async fn transaction_count(&self, address: Address) -> BlockchainResult<u64>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> BlockchainResult<u128>;

    /// Submit an EIP-2718 encoded signed transaction.
    ///
    /// A node error response maps to [`BlockchainError::Rejected`].
    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash>;

    /// Receipt of a mined transaction, `None` while pending.
    async fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<ReceiptSummary>>;

    async fn block_number(&self) -> BlockchainResult<u64>;

    async fn chain_id(&self) -> BlockchainResult<ChainId>;

    /// Read-only `eth_call` against `to`.
    async fn call(&self, to: Address, data: Bytes) -> BlockchainResult<Bytes>;

    /// Balance of `address` in wei.
    async fn balance(&self, address: Address) -> BlockchainResult<U256>;

    /// Runtime code at `address`; empty for accounts without code.
    async fn code_at(&self, address: Address) -> BlockchainResult<Bytes>;
}

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// alloy-backed [`ChainClient`] with failover support.
#[derive(Clone)]
pub struct RpcChainClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Configuration.
    config: BlockchainConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl RpcChainClient {
    /// Create a new blockchain client.
    ///
    /// Does not contact the node; an unreachable endpoint only surfaces on the
    /// first call.
    pub fn new(config: BlockchainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Unavailable(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            chain_id = config.chain_id,
            "Blockchain client initialized"
        );

        Ok(Self {
            providers,
            config,
            timeout_duration,
        })
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Run `op` against each provider in order until one answers.
    async fn with_failover<T, F, Fut>(&self, what: &str, op: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, op(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, call = what, "RPC error")
                }
                Err(_) => tracing::warn!(provider_idx = i, call = what, "RPC timeout"),
            }
        }
        Err(BlockchainError::Unavailable(format!(
            "All providers failed to {}",
            what
        )))
    }

    /// Get the configuration.
    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.with_failover("get transaction count", |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn gas_price(&self) -> BlockchainResult<u128> {
        self.with_failover("get gas price", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.send_raw_transaction(&raw)).await {
                Ok(Ok(pending)) => return Ok(*pending.tx_hash()),
                // The node saw the transaction and refused it; another node would too.
                Ok(Err(RpcError::ErrorResp(payload))) => {
                    return Err(BlockchainError::Rejected(payload.message.to_string()));
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "RPC error on submission")
                }
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout on submission"),
            }
        }
        Err(BlockchainError::Unavailable(
            "All providers failed to accept raw transaction".to_string(),
        ))
    }

    async fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<ReceiptSummary>> {
        let receipt = self
            .with_failover("get receipt", |p| async move {
                p.get_transaction_receipt(tx_hash).await
            })
            .await?;

        Ok(receipt.map(|r| ReceiptSummary {
            tx_hash: r.transaction_hash,
            success: r.status(),
            block_number: r.block_number,
            contract_address: r.contract_address,
        }))
    }

    async fn block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("get block number", |p| async move { p.get_block_number().await })
            .await
    }

    async fn chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("get chain id", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    async fn call(&self, to: Address, data: Bytes) -> BlockchainResult<Bytes> {
        self.with_failover("call contract", |p| {
            let request = TransactionRequest::default()
                .with_to(to)
                .with_input(data.clone());
            async move { p.call(request).await }
        })
        .await
    }

    async fn balance(&self, address: Address) -> BlockchainResult<U256> {
        self.with_failover("get balance", |p| async move { p.get_balance(address).await })
            .await
    }

    async fn code_at(&self, address: Address) -> BlockchainResult<Bytes> {
        self.with_failover("get code", |p| async move { p.get_code_at(address).await })
            .await
    }
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
