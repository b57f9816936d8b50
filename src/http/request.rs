//! Request head parsing and re-serialization.
//!
//! # Responsibilities
//! - Read exactly one request head off a buffered client stream
//! - Derive the target host from the request-target or `Host` header
//! - Normalize relative targets to absolute `http://` URLs
//! - Re-encode the head for the origin
//!
//! # Design Decisions
//! - The head is read line by line so no body or tunnel bytes are consumed
//! - Head size is capped before parsing

use std::io;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use url::Url;

use crate::http::body::BodyFraming;

/// Maximum number of headers accepted in one request.
pub const MAX_HEADERS: usize = 100;

/// Why a request head could not be read.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("connection closed before a request was sent")]
    Closed,
    #[error("connection closed in the middle of the request head")]
    Truncated,
    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),
    #[error("malformed request: {0}")]
    Malformed(#[from] httparse::Error),
    #[error("invalid request target {0:?}")]
    InvalidTarget(String),
    #[error("request does not name a target host")]
    MissingHost,
    #[error("invalid Content-Length {0:?}")]
    InvalidContentLength(String),
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// A single header as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: Vec<u8>,
}

/// The head of one client request.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub method: String,
    /// Request-target; absolute after [`ParsedRequest::normalize_target`].
    pub target: String,
    /// Target host, with port when the request named one.
    pub host: String,
    /// Minor HTTP version (0 or 1).
    pub version: u8,
    pub headers: Vec<Header>,
    pub framing: BodyFraming,
    absolute: bool,
}

impl ParsedRequest {
    /// Parse a complete request head.
    pub fn parse(head: &[u8]) -> Result<Self, ParseError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        if req.parse(head)?.is_partial() {
            return Err(ParseError::Truncated);
        }

        let method = req.method.unwrap_or_default().to_string();
        let target = req.path.unwrap_or_default().to_string();
        let version = req.version.unwrap_or(1);
        let headers: Vec<Header> = req
            .headers
            .iter()
            .map(|h| Header {
                name: h.name.to_string(),
                value: h.value.to_vec(),
            })
            .collect();

        let framing = BodyFraming::from_headers(&headers)?;
        let (host, absolute) = target_host(&method, &target, &headers)?;

        Ok(Self {
            method,
            target,
            host,
            version,
            headers,
            framing,
            absolute,
        })
    }

    pub fn is_connect(&self) -> bool {
        self.method.eq_ignore_ascii_case("CONNECT")
    }

    /// Whether the request-target is an absolute URL.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_slice())
    }

    /// Rewrite a relative target as `http://<host><target>`.
    pub fn normalize_target(&mut self) -> Result<(), ParseError> {
        if self.absolute {
            return Ok(());
        }
        // Validate only; the path is kept byte for byte.
        let absolute = format!("http://{}{}", self.host, self.target);
        Url::parse(&absolute).map_err(|_| ParseError::InvalidTarget(self.target.clone()))?;
        self.target = absolute;
        self.absolute = true;
        Ok(())
    }

    /// Encode the request line and headers for the origin.
    pub fn encode_head(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        out.extend_from_slice(
            format!("{} {} HTTP/1.{}\r\n", self.method, self.target, self.version).as_bytes(),
        );
        if self.header("host").is_none() {
            out.extend_from_slice(format!("Host: {}\r\n", self.host).as_bytes());
        }
        for header in &self.headers {
            out.extend_from_slice(header.name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(&header.value);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out
    }
}

/// Read one request head, up to and including the blank line.
///
/// Bytes after the head stay in `reader`.
pub async fn read_head<R>(reader: &mut R, max_bytes: usize) -> Result<Vec<u8>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = Vec::with_capacity(1024);
    let mut saw_request_line = false;

    loop {
        let remaining = max_bytes.saturating_sub(head.len());
        if remaining == 0 {
            return Err(ParseError::HeadTooLarge(max_bytes));
        }

        let start = head.len();
        let n = (&mut *reader)
            .take(remaining as u64)
            .read_until(b'\n', &mut head)
            .await?;
        if n == 0 {
            return Err(if head.is_empty() {
                ParseError::Closed
            } else {
                ParseError::Truncated
            });
        }

        let line = &head[start..];
        if !line.ends_with(b"\n") {
            if head.len() >= max_bytes {
                return Err(ParseError::HeadTooLarge(max_bytes));
            }
            return Err(ParseError::Truncated);
        }

        let blank = line == b"\r\n" || line == b"\n";
        if blank && saw_request_line {
            return Ok(head);
        }
        // httparse skips blank lines ahead of the request line
        if !blank {
            saw_request_line = true;
        }
    }
}

/// Read and parse one request.
pub async fn read_request<R>(reader: &mut R, max_bytes: usize) -> Result<ParsedRequest, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let head = read_head(reader, max_bytes).await?;
    ParsedRequest::parse(&head)
}

/// Work out the target host and whether the target is absolute.
fn target_host(method: &str, target: &str, headers: &[Header]) -> Result<(String, bool), ParseError> {
    if method.eq_ignore_ascii_case("CONNECT") {
        // authority-form: host:port
        if target.is_empty() || target.starts_with('/') {
            return Err(ParseError::InvalidTarget(target.to_string()));
        }
        return Ok((target.to_string(), false));
    }

    if target.starts_with('/') || target == "*" {
        let host = headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("host"))
            .and_then(|h| std::str::from_utf8(&h.value).ok())
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(ParseError::MissingHost)?;
        return Ok((host.to_string(), false));
    }

    let url = Url::parse(target).map_err(|_| ParseError::InvalidTarget(target.to_string()))?;
    if url.host_str().is_none() {
        return Err(ParseError::MissingHost);
    }
    // `Url` drops a port equal to the scheme default, so take the
    // authority as the client wrote it.
    let host = raw_authority(target).ok_or(ParseError::MissingHost)?;
    Ok((host.to_string(), true))
}

/// Host and optional port of an absolute URL, without userinfo.
fn raw_authority(target: &str) -> Option<&str> {
    let (_, rest) = target.split_once("://")?;
    let end = rest.find(|c: char| matches!(c, '/' | '?' | '#')).unwrap_or(rest.len());
    let authority = &rest[..end];
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    (!host.is_empty()).then_some(host)
}
