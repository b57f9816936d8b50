//! Byte relay between client and target streams.
//!
//! # Responsibilities
//! - One-directional copy for the forward path (target → client)
//! - Bidirectional tunnel for CONNECT, ending when either direction finishes
//! - Separate teardown errors from genuine transport failures
//!
//! # Design Decisions
//! - Each tunnel direction runs in its own task and reports into a two-slot channel
//! - The first report ends the tunnel: the other task is aborted and awaited,
//!   so both streams are dropped before `tunnel` returns
//! - Teardown is recognised by `io::ErrorKind`, never by message text

use std::fmt;
use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// An I/O failure observed while relaying bytes.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The stream was closed underneath the copy, typically by the other
    /// direction of a tunnel finishing first.
    #[error("connection closed: {0}")]
    Closed(#[source] io::Error),
    /// Any other transport failure.
    #[error("relay failed: {0}")]
    Io(#[source] io::Error),
}

impl RelayError {
    /// True when the error is an expected side effect of connection teardown.
    pub fn is_teardown(&self) -> bool {
        matches!(self, RelayError::Closed(_))
    }
}

impl From<io::Error> for RelayError {
    fn from(err: io::Error) -> Self {
        if is_teardown_kind(err.kind()) {
            RelayError::Closed(err)
        } else {
            RelayError::Io(err)
        }
    }
}

fn is_teardown_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}

/// Direction of a relayed byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToTarget,
    TargetToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToTarget => write!(f, "client->target"),
            Direction::TargetToClient => write!(f, "target->client"),
        }
    }
}

/// Result of one finished copy direction.
#[derive(Debug)]
pub struct Transfer {
    pub direction: Direction,
    pub result: Result<u64, RelayError>,
}

impl Transfer {
    /// Log the outcome, keeping teardown errors out of the error log.
    pub fn log(&self) {
        match &self.result {
            Ok(bytes) => {
                tracing::debug!(direction = %self.direction, bytes, "Relay finished")
            }
            Err(e) if e.is_teardown() => {
                tracing::debug!(direction = %self.direction, error = %e, "Relay closed during teardown")
            }
            Err(e) => tracing::error!(direction = %self.direction, error = %e, "Relay error"),
        }
    }
}

/// Copy everything from `reader` into `writer` until EOF or error.
pub async fn copy_one_way<R, W>(reader: &mut R, writer: &mut W, direction: Direction) -> Transfer
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let result = match tokio::io::copy(reader, writer).await {
        Ok(bytes) => writer.flush().await.map(|_| bytes).map_err(RelayError::from),
        Err(e) => Err(RelayError::from(e)),
    };
    Transfer { direction, result }
}

/// Relay bytes in both directions between `client` and `target`.
///
/// Returns the transfer that finished first. By the time this returns the
/// other direction has been cancelled and both streams have been dropped.
pub async fn tunnel<C, T>(client: C, target: T) -> Transfer
where
    C: AsyncRead + AsyncWrite + Send + 'static,
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut target_read, mut target_write) = tokio::io::split(target);
    let (done_tx, mut done_rx) = mpsc::channel(2);

    let upstream_tx = done_tx.clone();
    let upstream = tokio::spawn(async move {
        let transfer =
            copy_one_way(&mut client_read, &mut target_write, Direction::ClientToTarget).await;
        let _ = upstream_tx.send(transfer).await;
    });

    let downstream = tokio::spawn(async move {
        let transfer =
            copy_one_way(&mut target_read, &mut client_write, Direction::TargetToClient).await;
        let _ = done_tx.send(transfer).await;
    });

    let first = done_rx.recv().await;

    upstream.abort();
    downstream.abort();
    let _ = upstream.await;
    let _ = downstream.await;

    // Both senders live inside the tasks, so `None` means both tasks ended
    // without reporting, which only happens if they panicked.
    first.unwrap_or_else(|| Transfer {
        direction: Direction::TargetToClient,
        result: Err(RelayError::Io(io::Error::other("relay task ended without reporting"))),
    })
}
