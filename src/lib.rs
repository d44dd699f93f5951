//! Station ledger API library.
//!
//! HTTP API over an on-chain ledger of fueling stations, reservations and
//! payments. Replicas coordinate a single contract deployment, then turn
//! write requests into sequenced, signed and confirmed transactions.

// Core subsystems
pub mod blockchain;
pub mod config;
pub mod contract;
pub mod coordination;
pub mod http;
pub mod queries;

// Supporting features
pub mod seeding;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
