//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed request:
//!     → access_control.rs (refuse self-proxy and localhost targets)
//!     → Pass to forward or tunnel path
//! ```
//!
//! # Design Decisions
//! - Fail closed: a rejected request gets a bare 400 and no dial happens
//! - No client authentication; the proxy is open to anyone who can connect

pub mod access_control;

pub use access_control::SelfProxyGuard;
