//! Responses written by the proxy itself.
//!
//! Each is a bare status line and an empty header block; the proxy never
//! sends a body of its own.

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// A status line the proxy answers with directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyResponse {
    /// Self-proxy or localhost target.
    BadRequest,
    /// Target could not be dialed.
    BadGateway,
    /// CONNECT tunnel is ready.
    ConnectionEstablished,
}

impl ProxyResponse {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            ProxyResponse::BadRequest => b"HTTP/1.1 400 Bad Request\r\n\r\n",
            ProxyResponse::BadGateway => b"HTTP/1.1 502 Bad Gateway\r\n\r\n",
            ProxyResponse::ConnectionEstablished => b"HTTP/1.1 200 Connection established\r\n\r\n",
        }
    }

    /// Write and flush the response.
    pub async fn write_to<W>(self, writer: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        writer.write_all(self.as_bytes()).await?;
        writer.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_exact_status_lines() {
        let mut out = Vec::new();
        ProxyResponse::BadGateway.write_to(&mut out).await.unwrap();
        assert_eq!(out, b"HTTP/1.1 502 Bad Gateway\r\n\r\n");

        let mut out = Vec::new();
        ProxyResponse::ConnectionEstablished.write_to(&mut out).await.unwrap();
        assert_eq!(out, b"HTTP/1.1 200 Connection established\r\n\r\n");
    }
}
