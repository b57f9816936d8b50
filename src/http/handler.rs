//! Per-connection request handling.
//!
//! # Responsibilities
//! - Parse one request off the client connection
//! - Refuse self-proxy targets with 400
//! - Forward plain HTTP requests, tunnel CONNECT requests
//! - Answer dial failures with 502
//!
//! # Design Decisions
//! - Strictly sequential per connection: parse, guard, dial, relay
//! - Every exit path drops both streams, which closes them
//! - Parse failures get no response; there is no request to answer

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::config::ProxyConfig;
use crate::http::body::copy_body;
use crate::http::request::{read_request, ParsedRequest};
use crate::http::response::ProxyResponse;
use crate::net::address::{resolve_address, HTTPS_DEFAULT_PORT, HTTP_DEFAULT_PORT};
use crate::net::relay::{self, copy_one_way, Direction};
use crate::resilience::timeouts;
use crate::security::SelfProxyGuard;

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No valid request was read; nothing was sent back.
    Abandoned,
    /// Self-proxy target, answered with 400.
    Rejected,
    /// Target could not be dialed, answered with 502.
    BadGateway,
    /// A write to the client or target failed after dialing.
    WriteFailed,
    /// Plain HTTP request replayed and response relayed.
    Forwarded,
    /// CONNECT tunnel established and torn down.
    Tunneled,
}

/// Handles accepted connections. Holds only immutable settings, so one
/// instance is shared by every connection task.
#[derive(Debug, Clone)]
pub struct ConnectionHandler {
    guard: SelfProxyGuard,
    connect_timeout: Option<Duration>,
    max_head_bytes: usize,
}

impl ConnectionHandler {
    /// Build a handler for a proxy bound to `local_addr`.
    pub fn new(config: &ProxyConfig, local_addr: Option<SocketAddr>) -> Self {
        Self {
            guard: SelfProxyGuard::new(config.listener.bind_address.clone(), local_addr),
            connect_timeout: config.timeouts.connect_secs.map(Duration::from_secs),
            max_head_bytes: config.limits.max_request_head_bytes,
        }
    }

    /// Serve one client connection end to end.
    pub async fn handle<S>(&self, stream: S) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut client = BufReader::new(stream);

        let request = match read_request(&mut client, self.max_head_bytes).await {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "Error reading request");
                return Outcome::Abandoned;
            }
        };

        if self.guard.is_self_target(&request.host) {
            tracing::warn!(host = %request.host, "Rejecting self-proxy request");
            if let Err(e) = ProxyResponse::BadRequest.write_to(&mut client).await {
                tracing::debug!(error = %e, "Error writing 400 response");
            }
            return Outcome::Rejected;
        }

        tracing::info!(
            method = %request.method,
            host = %request.host,
            target = %request.target,
            "Received request"
        );

        if request.is_connect() {
            self.tunnel(client, request).await
        } else {
            self.forward(client, request).await
        }
    }

    /// Replay a plain HTTP request and relay the origin's response.
    async fn forward<S>(&self, mut client: BufReader<S>, mut request: ParsedRequest) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if let Err(e) = request.normalize_target() {
            tracing::warn!(error = %e, "Cannot build absolute URL for request");
            return Outcome::Abandoned;
        }

        let address = target_address(&request);
        let Some(mut target) = self.dial(&mut client, &address).await else {
            return Outcome::BadGateway;
        };

        if let Err(e) = send_request(&mut client, &mut target, &request).await {
            tracing::error!(target_addr = %address, error = %e, "Error writing to target");
            return Outcome::WriteFailed;
        }

        copy_one_way(&mut target, &mut client, Direction::TargetToClient)
            .await
            .log();
        Outcome::Forwarded
    }

    /// Open a CONNECT tunnel and relay opaque bytes both ways.
    async fn tunnel<S>(&self, mut client: BufReader<S>, request: ParsedRequest) -> Outcome
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let address = target_address(&request);
        let Some(mut target) = self.dial(&mut client, &address).await else {
            return Outcome::BadGateway;
        };

        if let Err(e) = ProxyResponse::ConnectionEstablished.write_to(&mut client).await {
            tracing::error!(error = %e, "Error writing CONNECT response");
            return Outcome::WriteFailed;
        }

        // The client may have pipelined data behind the CONNECT head.
        let early = client.buffer().to_vec();
        if !early.is_empty() {
            if let Err(e) = target.write_all(&early).await {
                tracing::error!(target_addr = %address, error = %e, "Error writing to target");
                return Outcome::WriteFailed;
            }
        }

        relay::tunnel(client.into_inner(), target).await.log();
        Outcome::Tunneled
    }

    /// Dial `address`, answering 502 on failure.
    async fn dial<W>(&self, client: &mut W, address: &str) -> Option<TcpStream>
    where
        W: AsyncWrite + Unpin,
    {
        tracing::debug!(target_addr = %address, "Connecting to target");
        match timeouts::connect(address, self.connect_timeout).await {
            Ok(stream) => Some(stream),
            Err(e) => {
                tracing::warn!(target_addr = %address, error = %e, "Error connecting to target");
                if let Err(e) = ProxyResponse::BadGateway.write_to(client).await {
                    tracing::debug!(error = %e, "Error writing 502 response");
                }
                None
            }
        }
    }
}

/// Dial address for a request; CONNECT defaults to 443, everything else to 80.
fn target_address(request: &ParsedRequest) -> String {
    let default_port = if request.is_connect() {
        HTTPS_DEFAULT_PORT
    } else {
        HTTP_DEFAULT_PORT
    };
    resolve_address(&request.host, default_port)
}

async fn send_request<R, W>(client: &mut R, target: &mut W, request: &ParsedRequest) -> std::io::Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    target.write_all(&request.encode_head()).await?;
    copy_body(request.framing, client, target).await?;
    Ok(())
}
