//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted TCP connection
//!     → server.rs (accept loop, task per connection)
//!     → handler.rs (guard, classify, dial)
//!     → request.rs (parse head, normalize target, re-encode)
//!     → body.rs (content-length or chunked body pass-through)
//!     → response.rs (400 / 502 / 200 Connection established)
//! ```

pub mod body;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{ConnectionHandler, Outcome};
pub use request::{ParseError, ParsedRequest};
pub use response::ProxyResponse;
pub use server::ProxyServer;
