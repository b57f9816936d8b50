//! TCP listener implementation with optional backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce an optional max_connections limit via semaphore

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;
use crate::net::address::bind_target;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),
    /// The connection limiter was closed.
    #[error("Connection limiter closed")]
    LimiterClosed,
}

/// A TCP listener that can limit concurrent connections.
///
/// Without a configured `max_connections` every accepted connection is handed
/// out immediately. With one, accept waits until a slot becomes available.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore limiting concurrent connections, when configured.
    connection_limit: Option<Arc<Semaphore>>,
}

impl Listener {
    /// Bind to the configured address.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let target = bind_target(&config.bind_address);
        let bind_error = |source| ListenerError::Bind {
            address: config.bind_address.clone(),
            source,
        };

        let listener = TcpListener::bind(target.as_str()).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        tracing::info!(
            address = %local_addr,
            max_connections = ?config.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            connection_limit: config
                .max_connections
                .map(|limit| Arc::new(Semaphore::new(limit))),
        })
    }

    /// Accept a new connection, respecting the connection limit if any.
    ///
    /// Returns the stream and a permit that must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // Acquire permit first (backpressure)
        let permit = match &self.connection_limit {
            Some(limit) => Some(
                limit
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| ListenerError::LimiterClosed)?,
            ),
            None => None,
        };

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = ?self.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Get current available connection slots, if limited.
    pub fn available_permits(&self) -> Option<usize> {
        self.connection_limit
            .as_ref()
            .map(|limit| limit.available_permits())
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the slot is released back to the listener. Unlimited
/// listeners hand out empty permits.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(address: &str, max_connections: Option<usize>) -> ListenerConfig {
        ListenerConfig {
            bind_address: address.to_string(),
            max_connections,
        }
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();

        let err = Listener::bind(&config(&address, None)).await.err().unwrap();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[tokio::test]
    async fn permits_are_returned_on_drop() {
        let listener = Listener::bind(&config("127.0.0.1:0", Some(2))).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert_eq!(listener.available_permits(), Some(2));

        let _client = TcpStream::connect(addr).await.unwrap();
        let (_stream, _, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), Some(1));

        drop(permit);
        assert_eq!(listener.available_permits(), Some(2));
    }

    #[tokio::test]
    async fn unlimited_listener_has_no_permits() {
        let listener = Listener::bind(&config("127.0.0.1:0", None)).await.unwrap();
        assert_eq!(listener.available_permits(), None);
    }
}
