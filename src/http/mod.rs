//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, trace span, timeout, body limit, metrics)
//!     → handlers.rs (validate body)
//!         writes → TransactionPipeline (nonce, sign, submit, confirm)
//!         reads  → LedgerQueries
//!     → response.rs (success body or error → status mapping)
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use handlers::{HealthStatus, NewReservation, NewStation};
pub use response::{ApiError, ErrorBody, WriteReceipt};
pub use server::{AppState, HttpServer};
