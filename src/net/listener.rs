//! IPv6-only TCP listener.
//!
//! # Responsibilities
//! - Bind to the configured IPv6 address
//! - Set `IPV6_V6ONLY` before binding so IPv4 clients are refused by the
//!   kernel, even on dual-stack hosts
//! - Hand the bound socket to the HTTPS server

use std::net::{SocketAddr, SocketAddrV6, TcpListener};

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// The requested address is not in the IPv6 family.
    NotIpv6(SocketAddr),
    /// Failed to bind to address.
    Bind(SocketAddr, std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::NotIpv6(addr) => write!(f, "Refusing non-IPv6 address {}", addr),
            ListenerError::Bind(addr, e) => write!(f, "Failed to bind IPv6 listener on {}: {}", addr, e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::NotIpv6(_) => None,
            ListenerError::Bind(_, e) => Some(e),
        }
    }
}

/// Bind a listening socket that only accepts IPv6 connections.
pub fn bind_ipv6_only(addr: SocketAddr) -> Result<TcpListener, ListenerError> {
    let SocketAddr::V6(v6) = addr else {
        return Err(ListenerError::NotIpv6(addr));
    };

    let listener = bind_v6_socket(v6).map_err(|e| ListenerError::Bind(addr, e))?;
    listener
        .set_nonblocking(true)
        .map_err(|e| ListenerError::Bind(addr, e))?;

    let local_addr = listener.local_addr().map_err(|e| ListenerError::Bind(addr, e))?;
    tracing::info!(address = %local_addr, v6_only = true, "Listener bound");

    Ok(listener)
}

#[cfg(unix)]
fn bind_v6_socket(addr: SocketAddrV6) -> std::io::Result<TcpListener> {
    use nix::sys::socket::{
        bind, listen, setsockopt, socket, sockopt, AddressFamily, Backlog, SockFlag, SockProtocol,
        SockType, SockaddrIn6,
    };
    use std::os::fd::AsRawFd;

    let fd = socket(
        AddressFamily::Inet6,
        SockType::Stream,
        SockFlag::empty(),
        SockProtocol::Tcp,
    )?;
    setsockopt(&fd, sockopt::ReuseAddr, &true)?;
    setsockopt(&fd, sockopt::Ipv6V6Only, &true)?;
    bind(fd.as_raw_fd(), &SockaddrIn6::from(addr))?;
    listen(&fd, Backlog::MAXCONN)?;

    Ok(TcpListener::from(fd))
}

#[cfg(not(unix))]
fn bind_v6_socket(_addr: SocketAddrV6) -> std::io::Result<TcpListener> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "IPv6-only listeners require a unix platform",
    ))
}
