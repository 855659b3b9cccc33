//! Host endpoint addresses.
//!
//! Accepted forms: `127.0.0.1:1123`, `localhost:1123`, `[::1]:1123`,
//! `ws://127.0.0.1:1123` and a bare port (`1123`, meaning `127.0.0.1`).

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::error::{ProtocolError, ProtocolResult};

/// A validated loopback address of a host RPC endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostTarget {
    addr: SocketAddr,
}

impl HostTarget {
    /// Parse and validate a target string.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidTarget`] for malformed input and
    /// [`ProtocolError::NonLoopback`] for any address outside loopback.
    pub fn parse(input: &str) -> ProtocolResult<Self> {
        let trimmed = input.trim();
        let rest = trimmed.strip_prefix("ws://").unwrap_or(trimmed);
        let rest = rest.trim_end_matches('/');

        if rest.is_empty() {
            return Err(ProtocolError::InvalidTarget("target is empty".into()));
        }

        if let Ok(port) = rest.parse::<u16>() {
            return Ok(Self::localhost(port));
        }

        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| ProtocolError::InvalidTarget(format!("missing port in {input}")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ProtocolError::InvalidTarget(format!("invalid port in {input}")))?;

        let host = host.trim_start_matches('[').trim_end_matches(']');
        let ip = if host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            host.parse::<IpAddr>()
                .map_err(|_| ProtocolError::NonLoopback(input.to_string()))?
        };

        Self::from_socket_addr(SocketAddr::new(ip, port))
    }

    /// A target on `127.0.0.1:port`.
    #[must_use]
    pub fn localhost(port: u16) -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port),
        }
    }

    /// Wrap a socket address, refusing anything outside loopback.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NonLoopback`] if `addr` is not a loopback
    /// address.
    pub fn from_socket_addr(addr: SocketAddr) -> ProtocolResult<Self> {
        if !addr.ip().is_loopback() {
            return Err(ProtocolError::NonLoopback(addr.to_string()));
        }
        Ok(Self { addr })
    }

    /// The socket address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// `WebSocket` URL for the client.
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

impl FromStr for HostTarget {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
