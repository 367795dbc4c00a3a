//! Host/port resolution for the passive server socket.

use serde::Deserialize;
use std::net::SocketAddr;

use crate::server::ServerError;

/// Address family of the listening socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    V4,
    V6,
}

impl Family {
    fn matches(&self, addr: &SocketAddr) -> bool {
        match self {
            Family::V4 => addr.is_ipv4(),
            Family::V6 => addr.is_ipv6(),
        }
    }
}

/// Socket type of the listening socket. Only byte streams are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
}

/// One resolved candidate, ready to be bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddr {
    pub family: Family,
    pub socket_type: SocketType,
    pub protocol: Protocol,
    pub canonical_name: String,
    pub addr: SocketAddr,
}

/// Resolves `host:port` and picks the last candidate of the requested family.
///
/// The last candidate is taken as-is; no attempt is made to rank them.
pub async fn resolve(host: &str, port: u16, family: Family) -> Result<ResolvedAddr, ServerError> {
    let candidates = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| ServerError::Resolve {
            host: host.to_string(),
            port,
            source: Some(e),
        })?;

    let addr = candidates
        .filter(|addr| family.matches(addr))
        .last()
        .ok_or_else(|| ServerError::Resolve {
            host: host.to_string(),
            port,
            source: None,
        })?;

    tracing::info!(host, port, address = %addr, "Resolved listen address");

    Ok(ResolvedAddr {
        family,
        socket_type: SocketType::Stream,
        protocol: Protocol::Tcp,
        canonical_name: host.to_string(),
        addr,
    })
}
