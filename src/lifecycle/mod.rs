//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     wallet → chain client → wait for node → artifact → pipeline
//!         → coordinator (deploy | wait | existing) → binding → AppState
//!
//! Shutdown (shutdown.rs):
//!     SIGINT/SIGTERM → broadcast → server drains → exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, the server never binds half-ready
//! - Subsystems initialize in order, not concurrently
//! - Demo seeding runs in the background once traffic is accepted

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{bootstrap, prepare, spawn_seeding, Application, StartupError};
