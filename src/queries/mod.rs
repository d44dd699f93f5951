//! Read query layer.
//!
//! # Data Flow
//! ```text
//! GET handler
//!     → LedgerQueries (list method by name)
//!     → ContractBinding::call (eth_call + ABI decode)
//!     → records.rs (tuple → record, timestamps via time.rs)
//! ```
//!
//! Reads are stateless and take no lock; they may run with any parallelism
//! and keep working while the write path is failing.

pub mod records;
pub mod time;

use alloy::dyn_abi::DynSolValue;
use std::sync::Arc;
use thiserror::Error;

use crate::blockchain::ChainClient;
use crate::contract::{
    BindingError, ContractBinding, LIST_PAYMENTS, LIST_RESERVATIONS, LIST_STATIONS,
};

pub use records::{PaymentRecord, ReservationRecord, StationRecord};
pub use time::{format_timestamp, DisplayTime};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Chain unavailable: {0}")]
    ChainUnavailable(String),

    #[error("Unexpected contract data: {0}")]
    Decode(String),
}

impl From<BindingError> for QueryError {
    fn from(err: BindingError) -> Self {
        match err {
            BindingError::Chain(e) => QueryError::ChainUnavailable(e.to_string()),
            other => QueryError::Decode(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct LedgerQueries {
    binding: Arc<ContractBinding>,
    client: Arc<dyn ChainClient>,
}

impl LedgerQueries {
    pub fn new(binding: Arc<ContractBinding>, client: Arc<dyn ChainClient>) -> Self {
        Self { binding, client }
    }

    pub async fn list_stations(&self) -> Result<Vec<StationRecord>, QueryError> {
        let items = self.list(LIST_STATIONS).await?;
        items.iter().map(StationRecord::from_tuple).collect()
    }

    pub async fn list_reservations(&self) -> Result<Vec<ReservationRecord>, QueryError> {
        let items = self.list(LIST_RESERVATIONS).await?;
        items.iter().map(ReservationRecord::from_tuple).collect()
    }

    pub async fn list_payments(&self) -> Result<Vec<PaymentRecord>, QueryError> {
        let items = self.list(LIST_PAYMENTS).await?;
        items.iter().map(PaymentRecord::from_tuple).collect()
    }

    /// Call a no-argument list method and unwrap its single array return.
    async fn list(&self, method: &str) -> Result<Vec<DynSolValue>, QueryError> {
        let mut outputs = self
            .binding
            .call(self.client.as_ref(), method, &[])
            .await?;

        if outputs.len() != 1 {
            return Err(QueryError::Decode(format!(
                "{method} returned {} values, expected 1",
                outputs.len()
            )));
        }
        match outputs.remove(0) {
            DynSolValue::Array(items) => {
                tracing::debug!(method, count = items.len(), "Listed contract records");
                Ok(items)
            }
            other => Err(QueryError::Decode(format!(
                "{method} returned {:?}, expected an array",
                other.as_type()
            ))),
        }
    }
}

impl std::fmt::Debug for LedgerQueries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerQueries")
            .field("contract", &self.binding.address())
            .finish()
    }
}
