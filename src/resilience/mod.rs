//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Startup probe of the node:
//!     → backoff.rs (exponential delay with jitter between attempts)
//! ```
//!
//! Transaction submission is deliberately not retried anywhere: resubmitting
//! a write risks a duplicate intent or a reused nonce.

pub mod backoff;

pub use backoff::{calculate_backoff, retry_with_backoff, BackoffPolicy};
