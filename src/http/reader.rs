//! Incremental request buffering.
//!
//! Bytes are read in fixed-size chunks until the header terminator has
//! arrived and the body holds at least the declared Content-Length. There
//! is no read timeout and no upper bound on the buffer.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::http::parser::{HEADER_TERMINATOR, find_headers_end};

/// Size of each read from the connection.
pub const READ_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    AwaitingHeaderTerminator,
    AwaitingBodyCompletion { expected: usize, buffered: usize },
    Complete,
}

#[derive(Debug)]
pub enum ReadError {
    /// Peer closed the connection before the header block was complete.
    Closed { buffered: usize },
    Io(std::io::Error),
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Closed { buffered } => write!(
                f,
                "connection closed after {} bytes without a complete header block",
                buffered
            ),
            ReadError::Io(e) => write!(f, "read failed: {}", e),
        }
    }
}

impl std::error::Error for ReadError {}

/// Classifies a buffer by how much of the request it holds.
///
/// A missing or non-numeric Content-Length counts as "no body expected".
pub fn assess(buf: &[u8]) -> ReadState {
    let Some(headers_end) = find_headers_end(buf) else {
        return ReadState::AwaitingHeaderTerminator;
    };
    let buffered = buf.len() - headers_end - HEADER_TERMINATOR.len();

    match declared_content_length(&buf[..headers_end]) {
        Some(expected) if expected > buffered => {
            ReadState::AwaitingBodyCompletion { expected, buffered }
        }
        _ => ReadState::Complete,
    }
}

fn declared_content_length(head: &[u8]) -> Option<usize> {
    let head = std::str::from_utf8(head).ok()?;
    head.split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .filter(|(key, _)| key.trim() == "Content-Length")
        .last()
        .and_then(|(_, value)| value.trim().parse().ok())
}

/// Reads one request from `stream` and returns the accumulated bytes unmodified.
///
/// If the peer closes mid-body, the partial buffer is returned and the
/// parser's length check decides its fate.
pub async fn read_request<R>(stream: &mut R) -> Result<Bytes, ReadError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(4096);
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let n = stream.read(&mut chunk).await.map_err(ReadError::Io)?;

        if n == 0 {
            return match assess(&buffer) {
                ReadState::AwaitingHeaderTerminator => Err(ReadError::Closed {
                    buffered: buffer.len(),
                }),
                _ => Ok(buffer.freeze()),
            };
        }

        buffer.extend_from_slice(&chunk[..n]);

        match assess(&buffer) {
            ReadState::Complete => return Ok(buffer.freeze()),
            state => trace!(?state, buffered = buffer.len(), "Waiting for more request bytes"),
        }
    }
}
