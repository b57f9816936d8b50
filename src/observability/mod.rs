//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!     → a `connection` span per accepted client, carrying the peer address
//!
//! Consumers:
//!     → logging.rs (fmt subscriber on stdout)
//! ```

pub mod logging;

pub use logging::init_logging;
