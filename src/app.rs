//! The application boundary.
//!
//! An application receives the request [`Environment`] and a [`Responder`],
//! declares its response through `start_response`, and returns the body as
//! a [`ResponseBody`]. It runs synchronously on a blocking thread; it never
//! sees the socket.

use bytes::Bytes;
use std::io;
use std::path::Path;

use crate::http::body::FileBody;
use crate::http::environ::Environment;
use crate::http::response::Responder;

pub trait Application: Send + Sync + 'static {
    fn call(
        &self,
        environ: Environment,
        responder: &mut Responder,
    ) -> anyhow::Result<ResponseBody>;
}

impl<F> Application for F
where
    F: Fn(Environment, &mut Responder) -> anyhow::Result<ResponseBody> + Send + Sync + 'static,
{
    fn call(
        &self,
        environ: Environment,
        responder: &mut Responder,
    ) -> anyhow::Result<ResponseBody> {
        self(environ, responder)
    }
}

pub type Chunks = Box<dyn Iterator<Item = anyhow::Result<Bytes>> + Send>;

/// Body chunks returned by an application. Iterated once, then dropped.
pub enum ResponseBody {
    Chunks(Chunks),
    /// Gets a `Content-Length` of the file size unless the application set one.
    File(FileBody),
}

impl ResponseBody {
    pub fn empty() -> Self {
        ResponseBody::Chunks(Box::new(std::iter::empty()))
    }

    pub fn once(chunk: impl Into<Bytes>) -> Self {
        ResponseBody::Chunks(Box::new(std::iter::once(Ok(chunk.into()))))
    }

    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        ResponseBody::Chunks(Box::new(chunks.into_iter().map(Ok)))
    }

    pub fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        FileBody::open(path).map(ResponseBody::File)
    }
}

impl Iterator for ResponseBody {
    type Item = anyhow::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ResponseBody::Chunks(chunks) => chunks.next(),
            ResponseBody::File(file) => file.next(),
        }
    }
}

/// Runs `app` for one request and pushes its body through `responder`.
///
/// The body is dropped when exhausted or on the first error.
pub fn serve(
    app: &dyn Application,
    environ: Environment,
    responder: &mut Responder,
) -> anyhow::Result<()> {
    let body = app.call(environ, responder)?;

    if let ResponseBody::File(file) = &body {
        responder.ensure_header("Content-Length", file.len().to_string());
    }

    for chunk in body {
        responder.write(&chunk?)?;
    }

    responder.finish()?;
    Ok(())
}
