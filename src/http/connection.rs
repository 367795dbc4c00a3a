use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::{self, Application};
use crate::http::environ::{Environment, EnvironmentBuilder, ServerIdentity};
use crate::http::parser::parse_request;
use crate::http::reader::read_request;
use crate::http::request::Request;
use crate::http::response::{Responder, StatusCode};
use crate::http::writer::{ResponseWriter, serialize_head, transmit};

/// Frames buffered between the application thread and the socket.
pub const FRAME_QUEUE_DEPTH: usize = 8;

/// One worker: one connection, one request, one response.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    identity: ServerIdentity,
    app: Arc<dyn Application>,
    state: ConnectionState,
}

#[derive(Debug)]
pub enum ConnectionState {
    Spawned,
    Reading,
    Parsed(Request),
    Dispatched(Environment),
    Responded,
    Terminated,
    Failed,
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        identity: ServerIdentity,
        app: Arc<dyn Application>,
    ) -> Self {
        Self {
            stream,
            peer,
            identity,
            app,
            state: ConnectionState::Spawned,
        }
    }

    /// Drives the connection to `Terminated`, or to `Failed` on the first error.
    ///
    /// The socket is shut down either way.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let result = self.drive().await;

        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer, error = %e, "shutdown failed");
        }

        result
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        loop {
            let current = std::mem::replace(&mut self.state, ConnectionState::Terminated);
            match self.step(current).await {
                Ok(ConnectionState::Terminated) => return Ok(()),
                Ok(next) => self.state = next,
                Err(e) => {
                    self.state = ConnectionState::Failed;
                    return Err(e);
                }
            }
        }
    }

    async fn step(&mut self, state: ConnectionState) -> anyhow::Result<ConnectionState> {
        match state {
            ConnectionState::Spawned => Ok(ConnectionState::Reading),

            ConnectionState::Reading => {
                let buf = read_request(&mut self.stream)
                    .await
                    .context("reading request")?;

                match parse_request(&buf) {
                    Ok(request) => {
                        info!(
                            peer = %self.peer,
                            method = %request.method,
                            path = %request.path,
                            content_length = ?request.content_length(),
                            "Request parsed"
                        );
                        Ok(ConnectionState::Parsed(request))
                    }
                    Err(e) if e.is_fatal() => {
                        Err(anyhow::Error::new(e).context("dropping request"))
                    }
                    Err(e) => {
                        warn!(peer = %self.peer, error = %e, "Malformed request");
                        self.respond_client_error().await?;
                        Ok(ConnectionState::Responded)
                    }
                }
            }

            ConnectionState::Parsed(request) => {
                let environ = EnvironmentBuilder::new()
                    .request(request)
                    .server(self.identity.clone())
                    .remote_addr(self.peer)
                    .build()?;
                Ok(ConnectionState::Dispatched(environ))
            }

            ConnectionState::Dispatched(environ) => {
                self.dispatch(environ).await?;
                Ok(ConnectionState::Responded)
            }

            ConnectionState::Responded | ConnectionState::Terminated => {
                Ok(ConnectionState::Terminated)
            }

            // A connection that failed once is never driven again.
            ConnectionState::Failed => anyhow::bail!("connection already failed"),
        }
    }

    /// Runs the application on the blocking pool and streams its frames out.
    async fn dispatch(&mut self, environ: Environment) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let handler = Arc::clone(&self.app);

        let application = tokio::task::spawn_blocking(move || {
            let mut responder = Responder::new(tx);
            app::serve(handler.as_ref(), environ, &mut responder)
                .map(|()| responder.state().map(|s| s.status.clone()).unwrap_or_default())
        });

        let sent = transmit(&mut self.stream, &mut rx).await;
        // Lets a still-running application see the disconnect.
        drop(rx);

        let status = application.await.context("application task failed")??;
        let frames = sent.context("writing response")?;

        info!(peer = %self.peer, status = %status, frames, "Responded");
        Ok(())
    }

    async fn respond_client_error(&mut self) -> anyhow::Result<()> {
        let body = StatusCode::BadRequest.to_string();
        let mut frame = serialize_head(
            &body,
            &[
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("Content-Length".to_string(), body.len().to_string()),
            ],
        );
        frame.extend_from_slice(body.as_bytes());

        ResponseWriter::new(frame.freeze())
            .write_to_stream(&mut self.stream)
            .await
            .context("writing error response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ResponseBody;
    use tokio::net::TcpListener;

    async fn connected() -> Connection {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();
        drop(client);

        let app = |_env: Environment, _responder: &mut Responder| -> anyhow::Result<ResponseBody> {
            Ok(ResponseBody::empty())
        };
        let identity = ServerIdentity {
            server_name: "localhost".to_string(),
            server_port: 8000,
        };
        Connection::new(stream, peer, identity, Arc::new(app))
    }

    #[tokio::test]
    async fn failure_is_recorded_and_sticky() {
        let mut conn = connected().await;

        assert!(conn.run().await.is_err());
        assert!(matches!(conn.state, ConnectionState::Failed));

        let again = conn.run().await.unwrap_err();
        assert_eq!(again.to_string(), "connection already failed");
        assert!(matches!(conn.state, ConnectionState::Failed));
    }
}
