//! The two-phase response protocol.
//!
//! An application first declares the status and headers with
//! [`Responder::start_response`], then writes body chunks. The header block
//! goes out exactly once, glued to the first chunk; nothing reaches the wire
//! before it.

use bytes::Bytes;
use tokio::sync::mpsc::Sender;
use tracing::debug;

use crate::http::writer::serialize_head;

/// HTTP status codes used by the transport and the bundled application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use wicket::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// Renders the status as it appears after the protocol version, e.g. `404 Not Found`.
impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

#[derive(Debug)]
pub enum ResponseError {
    /// start_response was called twice without an error signal.
    AlreadyDeclared,
    /// A body write came before start_response.
    NotDeclared,
    /// The error signal passed to start_response, re-raised because the
    /// headers were already on the wire.
    Application(anyhow::Error),
    /// The connection side stopped accepting frames.
    Disconnected,
}

impl std::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseError::AlreadyDeclared => write!(f, "response headers already declared"),
            ResponseError::NotDeclared => write!(f, "body write before start_response"),
            ResponseError::Application(e) => {
                write!(f, "application error after headers were sent: {}", e)
            }
            ResponseError::Disconnected => write!(f, "connection closed"),
        }
    }
}

impl std::error::Error for ResponseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResponseError::Application(e) => Some(&**e),
            _ => None,
        }
    }
}

/// What the application declared, and whether it has gone out yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseState {
    pub status: String,
    pub headers: Vec<(String, String)>,
    pub headers_sent: bool,
}

impl ResponseState {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Per-connection response state plus the outgoing frame queue.
///
/// Every successful write enqueues exactly one frame; the worker transmits
/// each frame with one socket write loop. The queue is bounded: a write
/// blocks the calling thread while the queue is full, so it must not be
/// called from async code.
pub struct Responder {
    state: Option<ResponseState>,
    frames: Sender<Bytes>,
}

impl Responder {
    pub fn new(frames: Sender<Bytes>) -> Self {
        Self { state: None, frames }
    }

    /// Declares status and headers.
    ///
    /// A second declaration fails with [`ResponseError::AlreadyDeclared`]
    /// unless `error` is given. With an error signal the declaration is
    /// replaced, or, once headers have been sent, the signal is handed back
    /// as [`ResponseError::Application`].
    pub fn start_response(
        &mut self,
        status: impl Into<String>,
        headers: Vec<(String, String)>,
        error: Option<anyhow::Error>,
    ) -> Result<BodyWriter<'_>, ResponseError> {
        match (&self.state, error) {
            (Some(state), Some(error)) if state.headers_sent => {
                return Err(ResponseError::Application(error));
            }
            (Some(_), None) => return Err(ResponseError::AlreadyDeclared),
            _ => {}
        }

        let status = status.into();
        debug!(status = %status, headers = headers.len(), "Response declared");
        self.state = Some(ResponseState {
            status,
            headers,
            headers_sent: false,
        });

        Ok(BodyWriter { responder: self })
    }

    /// Sends one body chunk, preceded by the header block on the first call.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), ResponseError> {
        let state = self.state.as_mut().ok_or(ResponseError::NotDeclared)?;

        let frame = if state.headers_sent {
            Bytes::copy_from_slice(chunk)
        } else {
            let mut buf = serialize_head(&state.status, &state.headers);
            buf.extend_from_slice(chunk);
            buf.freeze()
        };

        self.frames
            .blocking_send(frame)
            .map_err(|_| ResponseError::Disconnected)?;
        state.headers_sent = true;
        Ok(())
    }

    /// Sends the header block if the body never produced a chunk.
    pub fn finish(&mut self) -> Result<(), ResponseError> {
        match self.state.as_ref().map(|s| s.headers_sent) {
            None => Err(ResponseError::NotDeclared),
            Some(false) => self.write(&[]),
            Some(true) => Ok(()),
        }
    }

    /// Adds a header unless it is already declared or the headers are sent.
    ///
    /// Returns whether the header was added.
    pub fn ensure_header(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.state.as_mut() {
            Some(state) if !state.headers_sent && state.header(name).is_none() => {
                state.headers.push((name.to_string(), value.into()));
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> Option<&ResponseState> {
        self.state.as_ref()
    }

    pub fn headers_sent(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.headers_sent)
    }
}

/// Returned by [`Responder::start_response`]; may be called any number of times.
pub struct BodyWriter<'a> {
    responder: &'a mut Responder,
}

impl BodyWriter<'_> {
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), ResponseError> {
        self.responder.write(chunk)
    }
}
