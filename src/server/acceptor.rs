use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::app::Application;
use crate::http::connection::Connection;
use crate::http::environ::ServerIdentity;
use crate::server::{Listener, ServerError};

/// The accept loop and its worker supervisor.
///
/// Every accepted connection is moved into its own worker task; the loop
/// keeps no handle to the socket. Workers share nothing but the immutable
/// application.
pub struct Server {
    listener: Listener,
    app: Arc<dyn Application>,
}

impl Server {
    pub fn new(listener: Listener, app: impl Application) -> Self {
        Self {
            listener,
            app: Arc::new(app),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Serves until accept() fails.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` resolves or accept() fails.
    ///
    /// On exit the listener is closed first, so no new connection is
    /// accepted; workers still in flight then run to completion before this
    /// returns.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let Server { listener, app } = self;
        let identity = listener.identity();
        let mut workers = JoinSet::new();
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down");
                    break Ok(());
                }

                Some(joined) = workers.join_next_with_id(), if !workers.is_empty() => {
                    reap(joined);
                }

                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        info!(peer = %peer, "Accepted connection");
                        spawn_worker(&mut workers, socket, peer, &identity, &app);
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => {
                        debug!(error = %e, "accept interrupted, retrying");
                    }
                    Err(e) => {
                        error!(error = %e, "accept failed, stopping listener");
                        break Err(ServerError::Accept(e));
                    }
                },
            }
        };

        drop(listener);
        if !workers.is_empty() {
            info!(in_flight = workers.len(), "Waiting for in-flight workers");
        }
        while let Some(joined) = workers.join_next_with_id().await {
            reap(joined);
        }
        result
    }
}

fn spawn_worker(
    workers: &mut JoinSet<()>,
    socket: TcpStream,
    peer: SocketAddr,
    identity: &ServerIdentity,
    app: &Arc<dyn Application>,
) {
    let conn = Connection::new(socket, peer, identity.clone(), Arc::clone(app));
    let handle = workers.spawn(async move {
        let mut conn = conn;
        if let Err(e) = conn.run().await {
            error!(peer = %peer, error = %e, "Connection error");
        }
    });
    debug!(peer = %peer, worker = %handle.id(), "Spawned worker");
}

fn reap(joined: Result<(Id, ()), JoinError>) {
    match joined {
        Ok((id, ())) => debug!(worker = %id, "Worker terminated"),
        Err(e) if e.is_panic() => error!(worker = %e.id(), "Worker panicked"),
        Err(e) => warn!(worker = %e.id(), error = %e, "Worker cancelled"),
    }
}
