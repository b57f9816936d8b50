//! Forward HTTP/HTTPS proxy library.
//!
//! Plain HTTP requests are replayed to the origin with an absolute URL;
//! `CONNECT` requests get an opaque TCP tunnel.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::ProxyServer;
pub use lifecycle::Shutdown;
