//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Accept loop:
//!     → backoff.rs (delay after consecutive accept failures)
//!
//! Dial to target:
//!     → timeouts.rs (optional connect timeout)
//!     → On failure: 502 to the client, no retry
//! ```
//!
//! # Design Decisions
//! - Requests are never retried; a failed dial ends the request
//! - Accept failures are never fatal, only delayed

pub mod backoff;
pub mod timeouts;

pub use backoff::{calculate_backoff, Backoff};
