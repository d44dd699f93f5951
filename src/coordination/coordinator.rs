//! Deployment coordinator state machine.
//!
//! ```text
//! Unknown ──stored address──────────────────────────▶ Ready
//!    │
//!    ├─deployer──▶ Deploying ──confirmed + stored───▶ Ready
//!    │
//!    └─otherwise─▶ Waiting ────address observed─────▶ Ready
//! ```
//!
//! Every failure path is fatal to startup: the caller must not serve
//! traffic unless `run` returned an address.

use alloy::primitives::Address;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::blockchain::{TransactionPipeline, TxCall};
use crate::config::CoordinationConfig;
use crate::coordination::store::{AddressStore, CreateOutcome, StoreError};

#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error("Contract deployment failed: {0}")]
    DeploymentFailure(String),

    #[error("No contract address appeared within {waited_secs}s")]
    CoordinationTimeout { waited_secs: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Unknown,
    Deploying,
    Waiting,
    Ready(Address),
}

/// Address every replica agreed on, and whether this replica created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    pub address: Address,
    pub deployed_here: bool,
}

/// Performs the actual contract creation.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self) -> Result<Address, CoordinationError>;
}

/// Deploys through the transaction pipeline and checks the result on chain.
pub struct ContractDeployment {
    pipeline: Arc<TransactionPipeline>,
    call: TxCall,
}

impl ContractDeployment {
    pub fn new(pipeline: Arc<TransactionPipeline>, call: TxCall) -> Self {
        Self { pipeline, call }
    }
}

#[async_trait]
impl Deployer for ContractDeployment {
    async fn deploy(&self) -> Result<Address, CoordinationError> {
        let client = self.pipeline.client();
        let deployer = self.pipeline.address();

        let balance = client
            .balance(deployer)
            .await
            .map_err(|e| CoordinationError::DeploymentFailure(e.to_string()))?;
        if balance.is_zero() {
            return Err(CoordinationError::DeploymentFailure(format!(
                "deployer account {} has no balance",
                deployer
            )));
        }
        tracing::info!(deployer = %deployer, balance_wei = %balance, "Deploying contract");

        let outcome = self
            .pipeline
            .submit(self.call.clone())
            .await
            .map_err(|e| CoordinationError::DeploymentFailure(e.to_string()))?;

        if !outcome.is_confirmed() {
            return Err(CoordinationError::DeploymentFailure(format!(
                "deployment transaction {} reverted",
                outcome.tx_hash
            )));
        }
        let address = outcome.contract_address.ok_or_else(|| {
            CoordinationError::DeploymentFailure(format!(
                "receipt of {} carries no contract address",
                outcome.tx_hash
            ))
        })?;

        let code = client
            .code_at(address)
            .await
            .map_err(|e| CoordinationError::DeploymentFailure(e.to_string()))?;
        if code.is_empty() {
            return Err(CoordinationError::DeploymentFailure(format!(
                "no code at {} after deployment",
                address
            )));
        }

        tracing::info!(address = %address, tx_hash = %outcome.tx_hash, "Contract deployed");
        Ok(address)
    }
}

#[derive(Debug, Clone)]
pub struct CoordinationSettings {
    pub deployer: bool,
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl From<&CoordinationConfig> for CoordinationSettings {
    fn from(config: &CoordinationConfig) -> Self {
        Self {
            deployer: config.deployer,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_wait: Duration::from_secs(config.max_wait_secs),
        }
    }
}

pub struct DeploymentCoordinator {
    store: Arc<dyn AddressStore>,
    settings: CoordinationSettings,
    state: watch::Sender<CoordinatorState>,
}

impl DeploymentCoordinator {
    pub fn new(store: Arc<dyn AddressStore>, settings: CoordinationSettings) -> Self {
        let (state, _) = watch::channel(CoordinatorState::Unknown);
        Self {
            store,
            settings,
            state,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        *self.state.borrow()
    }

    fn transition(&self, next: CoordinatorState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(from = ?previous, to = ?next, "Coordinator transition");
    }

    /// Drive the state machine to `Ready` or fail.
    pub async fn run(&self, deployer: &dyn Deployer) -> Result<Deployment, CoordinationError> {
        if let Some(address) = self.store.try_read().await? {
            tracing::info!(address = %address, "Using existing contract");
            return Ok(self.ready(address, false));
        }

        if !self.settings.deployer {
            self.transition(CoordinatorState::Waiting);
            let address = self.wait_for_address().await?;
            return Ok(self.ready(address, false));
        }

        self.transition(CoordinatorState::Deploying);
        let address = deployer.deploy().await?;

        match self.store.create_if_absent(address).await? {
            CreateOutcome::Created => Ok(self.ready(address, true)),
            CreateOutcome::Existing(canonical) => {
                tracing::warn!(
                    canonical = %canonical,
                    orphaned = %address,
                    "Another deployment was stored first; using the stored address"
                );
                Ok(self.ready(canonical, false))
            }
        }
    }

    fn ready(&self, address: Address, deployed_here: bool) -> Deployment {
        self.transition(CoordinatorState::Ready(address));
        Deployment {
            address,
            deployed_here,
        }
    }

    async fn wait_for_address(&self) -> Result<Address, CoordinationError> {
        let max_wait = self.settings.max_wait;

        let waited = timeout(max_wait, async {
            let mut ticker = interval(self.settings.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match self.store.try_read().await {
                    Ok(Some(address)) => return address,
                    Ok(None) => {
                        tracing::info!("Waiting for the deployer replica to publish the address")
                    }
                    Err(e) => tracing::warn!(error = %e, "Address store read failed"),
                }
            }
        })
        .await;

        waited.map_err(|_| CoordinationError::CoordinationTimeout {
            waited_secs: max_wait.as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::store::MemoryAddressStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedDeployer {
        address: Address,
        calls: AtomicUsize,
    }

    impl FixedDeployer {
        fn new(address: Address) -> Self {
            Self {
                address,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Deployer for FixedDeployer {
        async fn deploy(&self) -> Result<Address, CoordinationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.address)
        }
    }

    struct FailingDeployer;

    #[async_trait]
    impl Deployer for FailingDeployer {
        async fn deploy(&self) -> Result<Address, CoordinationError> {
            Err(CoordinationError::DeploymentFailure("reverted".into()))
        }
    }

    fn settings(deployer: bool) -> CoordinationSettings {
        CoordinationSettings {
            deployer,
            poll_interval: Duration::from_millis(10),
            max_wait: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_existing_address_skips_deployment() {
        let existing = Address::repeat_byte(0x01);
        let store = Arc::new(MemoryAddressStore::with_address(existing));
        let deployer = FixedDeployer::new(Address::repeat_byte(0x02));

        let coordinator = DeploymentCoordinator::new(store, settings(true));
        let deployment = coordinator.run(&deployer).await.unwrap();

        assert_eq!(deployment.address, existing);
        assert!(!deployment.deployed_here);
        assert_eq!(deployer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.state(), CoordinatorState::Ready(existing));
    }

    #[tokio::test]
    async fn test_deployer_persists_address() {
        let store = Arc::new(MemoryAddressStore::new());
        let address = Address::repeat_byte(0x03);
        let coordinator = DeploymentCoordinator::new(store.clone(), settings(true));

        let deployment = coordinator.run(&FixedDeployer::new(address)).await.unwrap();
        assert_eq!(deployment, Deployment { address, deployed_here: true });
        assert_eq!(store.try_read().await.unwrap(), Some(address));
    }

    #[tokio::test]
    async fn test_deployment_failure_stays_unready() {
        let store = Arc::new(MemoryAddressStore::new());
        let coordinator = DeploymentCoordinator::new(store.clone(), settings(true));

        let err = coordinator.run(&FailingDeployer).await.unwrap_err();
        assert!(matches!(err, CoordinationError::DeploymentFailure(_)));
        assert_eq!(coordinator.state(), CoordinatorState::Deploying);
        assert_eq!(store.try_read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_waiter_times_out() {
        let coordinator =
            DeploymentCoordinator::new(Arc::new(MemoryAddressStore::new()), settings(false));
        let err = coordinator.run(&FailingDeployer).await.unwrap_err();
        assert!(matches!(err, CoordinationError::CoordinationTimeout { .. }));
        assert_eq!(coordinator.state(), CoordinatorState::Waiting);
    }

    #[tokio::test]
    async fn test_waiter_observes_late_address() {
        let store = Arc::new(MemoryAddressStore::new());
        let address = Address::repeat_byte(0x04);

        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            writer.create_if_absent(address).await.unwrap();
        });

        let coordinator = DeploymentCoordinator::new(store, settings(false));
        let deployment = coordinator.run(&FailingDeployer).await.unwrap();
        assert_eq!(deployment.address, address);
        assert!(!deployment.deployed_here);
    }

    #[tokio::test]
    async fn test_canonical_address_wins() {
        let canonical = Address::repeat_byte(0x05);

        // Store populated between our initial read and our write.
        struct RacingStore {
            inner: MemoryAddressStore,
            canonical: Address,
        }

        #[async_trait]
        impl AddressStore for RacingStore {
            async fn try_read(&self) -> Result<Option<Address>, StoreError> {
                Ok(None)
            }

            async fn create_if_absent(
                &self,
                address: Address,
            ) -> Result<CreateOutcome, StoreError> {
                self.inner.create_if_absent(self.canonical).await?;
                self.inner.create_if_absent(address).await
            }
        }

        let store = Arc::new(RacingStore {
            inner: MemoryAddressStore::new(),
            canonical,
        });
        let coordinator = DeploymentCoordinator::new(store, settings(true));
        let deployment = coordinator
            .run(&FixedDeployer::new(Address::repeat_byte(0x06)))
            .await
            .unwrap();

        assert_eq!(deployment.address, canonical);
        assert!(!deployment.deployed_here);
    }
}
