//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the deployer credential and check it against configuration
//! - Wait for the blockchain node with bounded backoff
//! - Coordinate the contract deployment across replicas
//! - Assemble the handler state once the contract address is known
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - `prepare` takes its collaborators as arguments so tests can inject a
//!   mock chain and an in-memory store; `bootstrap` wires production ones

use alloy::primitives::Address;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::blockchain::{
    BlockchainError, ChainClient, PipelineConfig, RpcChainClient, TransactionPipeline, Wallet,
};
use crate::config::AppConfig;
use crate::contract::{ArtifactError, BindingError, ContractArtifact, ContractBinding};
use crate::coordination::{
    AddressStore, ContractDeployment, CoordinationError, CoordinationSettings, Deployment,
    DeploymentCoordinator, FileAddressStore,
};
use crate::http::AppState;
use crate::resilience::{retry_with_backoff, BackoffPolicy};
use crate::seeding::{demo_plan, seed_demo_data, SeedOutcome};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Deployer credential: {0}")]
    Wallet(BlockchainError),

    #[error("Configured deployer address {configured} does not match the credential's address {actual}")]
    DeployerMismatch { configured: String, actual: Address },

    #[error("Blockchain node unreachable: {0}")]
    NodeUnreachable(BlockchainError),

    #[error("Blockchain client: {0}")]
    Client(BlockchainError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    #[error(transparent)]
    Binding(#[from] BindingError),
}

/// Everything the server needs once startup completed.
pub struct Application {
    pub state: AppState,
    pub deployment: Deployment,
}

/// Production wiring: environment credential, RPC client, file store.
pub async fn bootstrap(config: &AppConfig) -> Result<Application, StartupError> {
    let chain_config = &config.blockchain;

    let wallet = Wallet::from_env(chain_config.chain_id).map_err(StartupError::Wallet)?;
    if let Some(configured) = &chain_config.deployer_address {
        let matches = configured
            .parse::<Address>()
            .map(|address| address == wallet.address())
            .unwrap_or(false);
        if !matches {
            return Err(StartupError::DeployerMismatch {
                configured: configured.clone(),
                actual: wallet.address(),
            });
        }
    }

    let client = RpcChainClient::new(chain_config.clone()).map_err(StartupError::Client)?;
    let chain: Arc<dyn ChainClient> = Arc::new(client.clone());

    wait_for_node(config, chain.as_ref()).await?;
    if let Err(e) = client.verify_chain_id().await {
        tracing::warn!(error = %e, "Chain ID check failed; signing with configured chain ID");
    }

    let artifact = ContractArtifact::load(&config.contract.artifact_path)?;
    let store = Arc::new(FileAddressStore::new(&config.contract.address_file));

    prepare(config, wallet, chain, store, artifact).await
}

/// Pipeline, coordination and binding over the given collaborators.
pub async fn prepare(
    config: &AppConfig,
    wallet: Wallet,
    chain: Arc<dyn ChainClient>,
    store: Arc<dyn AddressStore>,
    artifact: ContractArtifact,
) -> Result<Application, StartupError> {
    let pipeline = Arc::new(TransactionPipeline::new(
        chain,
        wallet,
        PipelineConfig::from(&config.blockchain),
    ));

    let coordinator = DeploymentCoordinator::new(
        store,
        CoordinationSettings::from(&config.coordination),
    );
    let deployer = ContractDeployment::new(pipeline.clone(), artifact.deploy_call());
    let deployment = coordinator.run(&deployer).await?;

    let binding = Arc::new(ContractBinding::new(artifact.abi, deployment.address)?);
    tracing::info!(
        address = %deployment.address,
        deployed_here = deployment.deployed_here,
        "Contract ready"
    );

    Ok(Application {
        state: AppState::new(pipeline, binding),
        deployment,
    })
}

async fn wait_for_node(config: &AppConfig, chain: &dyn ChainClient) -> Result<(), StartupError> {
    let policy = BackoffPolicy {
        max_attempts: config.blockchain.node_ready_attempts.max(1),
        ..BackoffPolicy::default()
    };

    let block = retry_with_backoff("reach blockchain node", policy, || chain.block_number())
        .await
        .map_err(StartupError::NodeUnreachable)?;

    tracing::info!(block_number = block, "Blockchain node reachable");
    Ok(())
}

/// Seed demo data in the background when enabled and this replica created
/// the contract.
pub fn spawn_seeding(
    config: &AppConfig,
    app: &Application,
) -> Option<JoinHandle<Vec<SeedOutcome>>> {
    if !config.seeding.enabled {
        return None;
    }
    if !app.deployment.deployed_here {
        tracing::info!("Skipping demo data: contract was not deployed by this replica");
        return None;
    }

    let pipeline = app.state.pipeline.clone();
    let binding = app.state.binding.clone();
    let items = demo_plan(&mut fastrand::Rng::new());

    Some(tokio::spawn(async move {
        seed_demo_data(&pipeline, &binding, items).await
    }))
}
