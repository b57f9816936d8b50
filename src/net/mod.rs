//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, optional connection limit)
//!     → Hand off to proxy handler
//!     → address.rs (target host:port with default port)
//!     → relay.rs (one-way copy or bidirectional tunnel)
//! ```
//!
//! # Design Decisions
//! - Concurrency is unbounded unless a limit is configured
//! - Teardown errors are a distinct error variant, not a string match

pub mod address;
pub mod listener;
pub mod relay;

pub use address::{resolve_address, HTTPS_DEFAULT_PORT, HTTP_DEFAULT_PORT};
pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use relay::{copy_one_way, tunnel, Direction, RelayError, Transfer};
