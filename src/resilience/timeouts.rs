//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the target dial when a connect timeout is configured
//! - Leave the dial unbounded otherwise
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - An elapsed timeout surfaces as `io::ErrorKind::TimedOut`, so callers
//!   treat it like any other dial failure

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::net::TcpStream;

/// Run `operation`, failing with `TimedOut` if `limit` elapses first.
pub async fn with_timeout<F, T>(limit: Option<Duration>, operation: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, operation).await.map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("timed out after {}ms", limit.as_millis()),
            )
        })?,
        None => operation.await,
    }
}

/// Open a TCP connection to `address`, honouring an optional timeout.
pub async fn connect(address: &str, limit: Option<Duration>) -> io::Result<TcpStream> {
    with_timeout(limit, TcpStream::connect(address)).await
}
