//! Per-connection TLS session tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Run the TLS handshake through the rustls acceptor
//! - Log negotiated version, cipher suite and client address family once
//!   the connection becomes active
//!
//! Logging is a side effect only; it never changes how a connection is served.

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};

use axum_server::accept::Accept;
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use futures_util::future::BoxFuture;
use rustls::{CipherSuite, ProtocolVersion, ServerConnection};
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Address family of a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
    Unknown,
}

impl AddressFamily {
    /// Classify a remote address string such as `"[::1]:50412"` or `"10.0.0.1:443"`.
    ///
    /// Bare IPs are accepted too. IPv4-mapped IPv6 addresses count as IPv4.
    pub fn of_remote(remote: &str) -> Self {
        let ip = remote
            .parse::<SocketAddr>()
            .map(|addr| addr.ip())
            .or_else(|_| remote.parse::<IpAddr>());

        match ip {
            Ok(IpAddr::V4(_)) => AddressFamily::Ipv4,
            Ok(IpAddr::V6(v6)) if v6.to_ipv4_mapped().is_some() => AddressFamily::Ipv4,
            Ok(IpAddr::V6(_)) => AddressFamily::Ipv6,
            Err(_) => AddressFamily::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "IPv4",
            AddressFamily::Ipv6 => "IPv6",
            AddressFamily::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable label for a negotiated protocol version.
pub fn tls_version_label(version: Option<ProtocolVersion>) -> &'static str {
    match version {
        Some(ProtocolVersion::TLSv1_0) => "TLS 1.0",
        Some(ProtocolVersion::TLSv1_1) => "TLS 1.1",
        Some(ProtocolVersion::TLSv1_2) => "TLS 1.2",
        Some(ProtocolVersion::TLSv1_3) => "TLS 1.3",
        _ => "unknown",
    }
}

/// IANA name of a cipher suite.
///
/// rustls prefixes its TLS 1.3 suites with `TLS13_`; the registry names
/// them `TLS_*` like every other suite.
pub fn cipher_suite_label(suite: CipherSuite) -> &'static str {
    match suite {
        CipherSuite::TLS13_AES_128_GCM_SHA256 => "TLS_AES_128_GCM_SHA256",
        CipherSuite::TLS13_AES_256_GCM_SHA384 => "TLS_AES_256_GCM_SHA384",
        CipherSuite::TLS13_CHACHA20_POLY1305_SHA256 => "TLS_CHACHA20_POLY1305_SHA256",
        other => other.as_str().unwrap_or("unknown"),
    }
}

/// Negotiated parameters of an active TLS session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub version: &'static str,
    pub cipher: &'static str,
    pub family: AddressFamily,
    pub remote: String,
}

impl SessionInfo {
    pub fn from_connection(conn: &ServerConnection, remote: &str) -> Self {
        let cipher = conn
            .negotiated_cipher_suite()
            .map(|suite| cipher_suite_label(suite.suite()))
            .unwrap_or("unknown");

        Self {
            version: tls_version_label(conn.protocol_version()),
            cipher,
            family: AddressFamily::of_remote(remote),
            remote: remote.to_string(),
        }
    }

    fn log(&self, id: ConnectionId) {
        tracing::info!(
            connection_id = %id,
            version = self.version,
            cipher = self.cipher,
            family = %self.family,
            remote = %self.remote,
            "TLS connection"
        );
    }
}

/// Rustls acceptor that logs every session once its handshake completes.
#[derive(Clone)]
pub struct SessionLogAcceptor {
    inner: RustlsAcceptor,
}

impl SessionLogAcceptor {
    pub fn new(config: RustlsConfig) -> Self {
        Self {
            inner: RustlsAcceptor::new(config),
        }
    }
}

impl fmt::Debug for SessionLogAcceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLogAcceptor").finish_non_exhaustive()
    }
}

impl<S> Accept<TcpStream, S> for SessionLogAcceptor
where
    S: Send + 'static,
{
    type Stream = TlsStream<TcpStream>;
    type Service = S;
    type Future = BoxFuture<'static, io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: TcpStream, service: S) -> Self::Future {
        let id = ConnectionId::new();
        let remote = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        let handshake = self.inner.accept(stream, service);

        Box::pin(async move {
            match handshake.await {
                Ok((stream, service)) => {
                    SessionInfo::from_connection(stream.get_ref().1, &remote).log(id);
                    Ok((stream, service))
                }
                Err(e) => {
                    tracing::debug!(connection_id = %id, remote = %remote, error = %e, "TLS handshake failed");
                    Err(e)
                }
            }
        })
    }
}
