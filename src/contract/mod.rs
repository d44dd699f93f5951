//! Ledger contract subsystem.
//!
//! # Data Flow
//! ```text
//! artifact JSON (built externally)
//!     → artifact.rs (ABI + creation code)
//!     → coordination (deploys code or reads stored address)
//!     → binding.rs (ABI bound to address; encodes calls, decodes results)
//! ```
//!
//! The contract's business rules live on chain. This module only knows the
//! method signatures and tuple shapes.

pub mod artifact;
pub mod binding;

pub use artifact::{ArtifactError, ContractArtifact};
pub use binding::{
    BindingError, ContractBinding, ADD_STATION, CREATE_RESERVATION, LIST_PAYMENTS,
    LIST_RESERVATIONS, LIST_STATIONS,
};
