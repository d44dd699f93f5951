//! Deployment coordination between replicas.
//!
//! # Data Flow
//! ```text
//! startup
//!     → coordinator.rs (read store; deploy or wait)
//!     → store.rs (create-if-absent write / polling read)
//!     → Deployment { address, deployed_here }
//! ```
//!
//! # Design Decisions
//! - Exactly one replica carries the deployer flag; two deployers racing is
//!   an operator error, but the store still never overwrites an address
//! - The store is the only state shared across processes

pub mod coordinator;
pub mod store;

pub use coordinator::{
    ContractDeployment, CoordinationError, CoordinationSettings, CoordinatorState, Deployer,
    Deployment, DeploymentCoordinator,
};
pub use store::{AddressStore, CreateOutcome, FileAddressStore, MemoryAddressStore, StoreError};
