//! Proxy server: bind, accept, dispatch.
//!
//! # Responsibilities
//! - Bind the listener (bind failure is fatal)
//! - Accept connections forever, one tokio task per connection
//! - Keep accepting through accept errors
//! - Stop accepting when the shutdown signal fires

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::http::handler::ConnectionHandler;
use crate::lifecycle::Shutdown;
use crate::net::listener::{Listener, ListenerError};
use crate::resilience::Backoff;

/// First delay after an accept failure.
const ACCEPT_BACKOFF_BASE_MS: u64 = 5;
/// Longest delay between accept attempts.
const ACCEPT_BACKOFF_MAX_MS: u64 = 1000;

/// Forward HTTP/HTTPS proxy server.
pub struct ProxyServer {
    config: Arc<ProxyConfig>,
}

impl ProxyServer {
    /// Create a new server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Bind the configured listen address.
    pub async fn bind(&self) -> Result<Listener, ListenerError> {
        Listener::bind(&self.config.listener).await
    }

    /// Bind and accept connections until the process exits.
    pub async fn start(self) -> Result<(), ListenerError> {
        let listener = self.bind().await?;
        let shutdown = Shutdown::new();
        self.serve(listener, shutdown.subscribe()).await
    }

    /// Accept connections on `listener` until `shutdown` fires.
    ///
    /// Connections already being handled are left to finish on their own.
    pub async fn serve(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        let local_addr = listener.local_addr().ok();
        let handler = Arc::new(ConnectionHandler::new(&self.config, local_addr));
        let mut backoff = Backoff::new(ACCEPT_BACKOFF_BASE_MS, ACCEPT_BACKOFF_MAX_MS);

        tracing::info!(
            address = %self.config.listener.bind_address,
            local_addr = ?local_addr,
            "Proxy listening"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        backoff.reset();
                        let handler = Arc::clone(&handler);
                        let span = tracing::info_span!("connection", peer = %peer_addr);
                        tokio::spawn(
                            async move {
                                tracing::debug!("New connection");
                                let outcome = handler.handle(stream).await;
                                tracing::debug!(?outcome, "Connection closed");
                                drop(permit);
                            }
                            .instrument(span),
                        );
                    }
                    Err(ListenerError::LimiterClosed) => return Err(ListenerError::LimiterClosed),
                    Err(e) => {
                        let delay = backoff.next_delay();
                        tracing::warn!(
                            error = %e,
                            consecutive_failures = backoff.failures(),
                            retry_in = ?delay,
                            "Error accepting connection"
                        );
                        tokio::time::sleep(delay).await;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        Ok(())
    }
}
