//! Request body framing and pass-through.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::request::{Header, ParseError};

/// Longest chunk-size or trailer line accepted in a chunked body.
const MAX_CHUNK_LINE: u64 = 4096;

/// How the request body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    None,
    ContentLength(u64),
    Chunked,
}

impl BodyFraming {
    /// Determine framing from request headers.
    ///
    /// `Transfer-Encoding: chunked` wins over `Content-Length`.
    pub fn from_headers(headers: &[Header]) -> Result<Self, ParseError> {
        let chunked = headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case("transfer-encoding"))
            .filter_map(|h| std::str::from_utf8(&h.value).ok())
            .flat_map(|v| v.split(','))
            .last()
            .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
        if chunked {
            return Ok(BodyFraming::Chunked);
        }

        let Some(header) = headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("content-length"))
        else {
            return Ok(BodyFraming::None);
        };

        let raw = String::from_utf8_lossy(&header.value).trim().to_string();
        match raw.parse::<u64>() {
            Ok(0) => Ok(BodyFraming::None),
            Ok(len) => Ok(BodyFraming::ContentLength(len)),
            Err(_) => Err(ParseError::InvalidContentLength(raw)),
        }
    }
}

/// Copy the request body from `reader` to `writer` according to `framing`.
///
/// Chunked bodies are passed through unchanged, trailer section included.
pub async fn copy_body<R, W>(framing: BodyFraming, reader: &mut R, writer: &mut W) -> io::Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copied = match framing {
        BodyFraming::None => 0,
        BodyFraming::ContentLength(len) => copy_exact(reader, writer, len).await?,
        BodyFraming::Chunked => copy_chunked(reader, writer).await?,
    };
    writer.flush().await?;
    Ok(copied)
}

async fn copy_exact<R, W>(reader: &mut R, writer: &mut W, len: u64) -> io::Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copied = tokio::io::copy(&mut (&mut *reader).take(len), writer).await?;
    if copied < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("body ended after {copied} of {len} bytes"),
        ));
    }
    Ok(copied)
}

async fn copy_chunked<R, W>(reader: &mut R, writer: &mut W) -> io::Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut total = 0;
    loop {
        let line = read_line(reader).await?;
        writer.write_all(&line).await?;
        total += line.len() as u64;

        let size = chunk_size(&line)?;
        if size == 0 {
            break;
        }
        // chunk data plus its CRLF
        total += copy_exact(reader, writer, size + 2).await?;
    }

    // trailer section ends with a blank line
    loop {
        let line = read_line(reader).await?;
        writer.write_all(&line).await?;
        total += line.len() as u64;
        if line == b"\r\n" || line == b"\n" {
            return Ok(total);
        }
    }
}

async fn read_line<R>(reader: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    (&mut *reader)
        .take(MAX_CHUNK_LINE)
        .read_until(b'\n', &mut line)
        .await?;
    if !line.ends_with(b"\n") {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "chunked body ended mid-line",
        ));
    }
    Ok(line)
}

fn chunk_size(line: &[u8]) -> io::Result<u64> {
    let text = std::str::from_utf8(line)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "chunk size is not ASCII"))?;
    let digits = text.split(';').next().unwrap_or_default().trim();
    u64::from_str_radix(digits, 16).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid chunk size {digits:?}"),
        )
    })
}
