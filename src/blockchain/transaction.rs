//! Transaction pipeline: sequence, sign, submit, confirm.
//!
//! # Responsibilities
//! - Reserve a nonce inside the process-wide critical section
//! - Build and sign the transaction outside of it
//! - Submit the raw transaction and poll for its receipt
//!
//! A [`TxError::ConfirmationTimeout`] only ends the caller's wait; the
//! transaction may still be mined afterwards. Nothing is resubmitted.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::blockchain::client::ChainClient;
use crate::blockchain::nonce::{NonceManager, NonceReservation};
use crate::blockchain::types::{
    BlockchainConfig, BlockchainError, TransactionOutcome, TxError, TxResult,
};
use crate::blockchain::wallet::Wallet;
use crate::observability::metrics;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// One logical write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxCall {
    /// Contract creation with the given init code.
    Deploy { code: Bytes },
    /// Call of `method` on the contract at `to` with pre-encoded `data`.
    Invoke {
        to: Address,
        method: String,
        data: Bytes,
    },
}

impl TxCall {
    /// Label used in logs and metrics.
    pub fn label(&self) -> &str {
        match self {
            TxCall::Deploy { .. } => "deploy",
            TxCall::Invoke { method, .. } => method.as_str(),
        }
    }
}

/// Static inputs of every transaction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub gas_limit: u64,
    pub gas_price_multiplier: f64,
    pub max_gas_price_gwei: u64,
    pub receipt_poll_interval: Duration,
    pub confirmation_timeout: Duration,
}

impl From<&BlockchainConfig> for PipelineConfig {
    fn from(config: &BlockchainConfig) -> Self {
        Self {
            gas_limit: config.gas_limit,
            gas_price_multiplier: config.gas_price_multiplier,
            max_gas_price_gwei: config.max_gas_price_gwei,
            receipt_poll_interval: Duration::from_millis(config.receipt_poll_interval_ms),
            confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
        }
    }
}

/// Turns [`TxCall`]s into confirmed transactions for the deployer account.
pub struct TransactionPipeline {
    client: Arc<dyn ChainClient>,
    wallet: Wallet,
    nonces: Arc<NonceManager>,
    config: PipelineConfig,
}

impl TransactionPipeline {
    pub fn new(client: Arc<dyn ChainClient>, wallet: Wallet, config: PipelineConfig) -> Self {
        Self {
            client,
            wallet,
            nonces: NonceManager::new(),
            config,
        }
    }

    /// Run one write through the pipeline.
    ///
    /// A mined-but-reverted transaction is returned as an outcome with a
    /// failed status, not as an error.
    pub async fn submit(&self, call: TxCall) -> TxResult<TransactionOutcome> {
        let label = call.label().to_string();
        let started = Instant::now();

        let result = self.run(call).await;

        let outcome_label = match &result {
            Ok(outcome) if outcome.is_confirmed() => "confirmed",
            Ok(_) => "reverted",
            Err(e) => e.kind(),
        };
        metrics::record_transaction(&label, outcome_label, started);
        result
    }

    async fn run(&self, call: TxCall) -> TxResult<TransactionOutcome> {
        let (reservation, gas_price) = self.acquire_nonce().await?;
        let label = call.label().to_string();
        let request = self.build(call, reservation.nonce(), gas_price);

        // Detached: once reserved, a nonce is broadcast or released even if
        // the caller stops waiting.
        let tx_hash = tokio::spawn(broadcast(
            self.client.clone(),
            self.wallet.clone(),
            reservation,
            request,
            label.clone(),
        ))
        .await
        .map_err(|e| TxError::ChainUnavailable(format!("Submission task failed: {}", e)))??;

        let outcome = self.wait_for_confirmation(tx_hash).await?;
        tracing::info!(
            method = %label,
            tx_hash = %tx_hash,
            block = ?outcome.block_number,
            status = ?outcome.status,
            "Transaction mined"
        );
        Ok(outcome)
    }

    /// Reserve a nonce and read the gas price in one critical section.
    ///
    /// If either fetch fails the counter is left where it was.
    async fn acquire_nonce(&self) -> TxResult<(NonceReservation, u128)> {
        let slot = self.nonces.lock().await;

        let chain_nonce = self
            .client
            .transaction_count(self.wallet.address())
            .await
            .map_err(TxError::unavailable)?;
        let gas_price = self.client.gas_price().await.map_err(TxError::unavailable)?;

        let gas_price_gwei = gas_price / WEI_PER_GWEI;
        if gas_price_gwei > self.config.max_gas_price_gwei as u128 {
            return Err(TxError::GasPriceTooHigh {
                current_gwei: gas_price_gwei as u64,
                max_gwei: self.config.max_gas_price_gwei,
            });
        }
        let adjusted_gas_price = (gas_price as f64 * self.config.gas_price_multiplier) as u128;

        Ok((slot.reserve(chain_nonce), adjusted_gas_price))
    }

    /// Deterministic request from call, nonce and gas parameters.
    fn build(&self, call: TxCall, nonce: u64, gas_price: u128) -> TransactionRequest {
        let request = match call {
            TxCall::Deploy { code } => TransactionRequest::default().with_deploy_code(code),
            TxCall::Invoke { to, data, .. } => {
                TransactionRequest::default().with_to(to).with_input(data)
            }
        };

        request
            .with_nonce(nonce)
            .with_gas_price(gas_price)
            .with_gas_limit(self.config.gas_limit)
            .with_chain_id(self.wallet.chain_id())
    }

    /// Poll for the receipt at a fixed interval until the confirmation window closes.
    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> TxResult<TransactionOutcome> {
        let window = self.config.confirmation_timeout;

        let result = timeout(window, async {
            let mut ticker = interval(self.config.receipt_poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match self.client.transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return TransactionOutcome::from(receipt),
                    Ok(None) => tracing::debug!(tx_hash = %tx_hash, "Transaction pending"),
                    // A failed poll is not a verdict on the transaction.
                    Err(e) => tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed"),
                }
            }
        })
        .await;

        result.map_err(|_| {
            tracing::warn!(
                tx_hash = %tx_hash,
                waited_secs = window.as_secs(),
                "Confirmation wait expired"
            );
            TxError::ConfirmationTimeout {
                tx_hash,
                waited_secs: window.as_secs(),
            }
        })
    }

    /// Deployer account address.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Next nonce this process would use, if any transaction was sequenced yet.
    pub async fn pending_nonce(&self) -> Option<u64> {
        self.nonces.peek().await
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }
}

/// Sign and send one transaction, settling its nonce reservation.
async fn broadcast(
    client: Arc<dyn ChainClient>,
    wallet: Wallet,
    reservation: NonceReservation,
    request: TransactionRequest,
    label: String,
) -> TxResult<TxHash> {
    let nonce = reservation.nonce();

    let signed = match wallet.sign(request).await {
        Ok(signed) => signed,
        Err(e) => {
            reservation.release().await;
            return Err(TxError::Signing(e.to_string()));
        }
    };

    let tx_hash = match client.send_raw_transaction(signed.raw).await {
        Ok(hash) => hash,
        Err(BlockchainError::Rejected(reason)) => {
            tracing::warn!(method = %label, nonce, reason = %reason, "Transaction rejected");
            reservation.release().await;
            return Err(TxError::SubmissionRejected(reason));
        }
        Err(e) => {
            // The node may have received it; only its pending count can tell.
            tracing::warn!(method = %label, nonce, error = %e, "Submission failed");
            return Err(TxError::unavailable(e));
        }
    };

    if tx_hash != signed.tx_hash {
        tracing::warn!(
            local = %signed.tx_hash,
            remote = %tx_hash,
            "Node reported a different transaction hash"
        );
    }

    tracing::info!(method = %label, nonce, tx_hash = %tx_hash, "Transaction submitted");
    Ok(tx_hash)
}
