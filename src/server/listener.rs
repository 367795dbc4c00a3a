use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{info, warn};

use crate::http::environ::ServerIdentity;
use crate::server::{ServerConfig, ServerError};

/// Address bound when the configured one is refused.
pub const FALLBACK_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 7000));

/// A bound, listening TCP socket.
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
    server_name: String,
}

impl Listener {
    /// Binds and starts listening.
    ///
    /// A failed bind degrades to [`FALLBACK_ADDR`] once. A failed listen is
    /// fatal; the socket is closed before the error is returned.
    pub fn bind(cfg: &ServerConfig) -> Result<Self, ServerError> {
        let requested = cfg.resolved.addr;
        let socket = open_socket(&requested).map_err(ServerError::Socket)?;

        let socket = match socket.bind(requested) {
            Ok(()) => socket,
            Err(e) => {
                warn!(
                    address = %requested,
                    fallback = %FALLBACK_ADDR,
                    error = %e,
                    "Bind failed, falling back to default address"
                );
                drop(socket);
                let fallback = open_socket(&FALLBACK_ADDR).map_err(ServerError::Socket)?;
                fallback.bind(FALLBACK_ADDR).map_err(|source| ServerError::Bind {
                    addr: FALLBACK_ADDR,
                    source,
                })?;
                fallback
            }
        };

        let local_addr = socket.local_addr().map_err(ServerError::Socket)?;
        let inner = socket.listen(cfg.backlog).map_err(ServerError::Listen)?;
        let server_name = derive_server_name(&cfg.resolved.canonical_name, &local_addr);

        info!(server_name = %server_name, address = %local_addr, "Listening");

        Ok(Self {
            inner,
            local_addr,
            server_name,
        })
    }

    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept().await
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Name and port reported to applications in every environment.
    pub fn identity(&self) -> ServerIdentity {
        ServerIdentity {
            server_name: self.server_name.clone(),
            server_port: self.local_addr.port(),
        }
    }
}

fn open_socket(addr: &SocketAddr) -> io::Result<TcpSocket> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(true)?;
    Ok(socket)
}

/// Best-effort fully qualified name for the bound address.
///
/// Loopback and wildcard addresses map to `localhost`; a host given by name
/// keeps that name; anything else is reported as the IP literal.
pub fn derive_server_name(host: &str, addr: &SocketAddr) -> String {
    let ip = addr.ip();
    if ip.is_loopback() || ip.is_unspecified() {
        return "localhost".to_string();
    }
    if !host.is_empty() && host.parse::<IpAddr>().is_err() {
        return host.to_string();
    }
    ip.to_string()
}
