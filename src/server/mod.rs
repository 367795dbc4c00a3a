//! Socket bootstrap and the accept loop.
//!
//! ```text
//! resolve(host, port) ──► Listener::bind ──► Server::run_until
//!                                               │ accept
//!                                               ├──► worker task (one per connection)
//!                                               └──◄ join_next (reap finished workers)
//! ```

pub mod acceptor;
pub mod listener;
pub mod resolver;

pub use acceptor::Server;
pub use listener::Listener;
pub use resolver::{Family, ResolvedAddr};

use std::net::SocketAddr;

use crate::config::ServerSettings;

/// Errors that stop the server. All of them are fatal for the process.
#[derive(Debug)]
pub enum ServerError {
    /// Name resolution failed or produced no usable candidate.
    Resolve {
        host: String,
        port: u16,
        source: Option<std::io::Error>,
    },
    /// The listening socket could not be created or configured.
    Socket(std::io::Error),
    /// Both the requested and the fallback address refused to bind.
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    Listen(std::io::Error),
    /// accept() failed with something other than an interruption.
    Accept(std::io::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Resolve { host, port, source: Some(e) } => {
                write!(f, "failed to resolve {}:{}: {}", host, port, e)
            }
            ServerError::Resolve { host, port, source: None } => {
                write!(f, "no address candidates for {}:{}", host, port)
            }
            ServerError::Socket(e) => write!(f, "socket: {}", e),
            ServerError::Bind { addr, source } => write!(f, "bind {}: {}", addr, source),
            ServerError::Listen(e) => write!(f, "listen: {}", e),
            ServerError::Accept(e) => write!(f, "accept: {}", e),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Resolve { source, .. } => source
                .as_ref()
                .map(|e| e as &(dyn std::error::Error + 'static)),
            ServerError::Socket(e) | ServerError::Listen(e) | ServerError::Accept(e) => Some(e),
            ServerError::Bind { source, .. } => Some(source),
        }
    }
}

/// Resolved, immutable parameters of the listening socket.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub resolved: ResolvedAddr,
    pub backlog: u32,
}

impl ServerConfig {
    pub async fn resolve(settings: &ServerSettings) -> Result<Self, ServerError> {
        let resolved = resolver::resolve(&settings.host, settings.port, settings.family).await?;
        Ok(Self {
            host: settings.host.clone(),
            port: settings.port,
            resolved,
            backlog: settings.backlog,
        })
    }
}
