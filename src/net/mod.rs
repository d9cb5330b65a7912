//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection (IPv6 only)
//!     → listener.rs (IPV6_V6ONLY socket, IPv4 refused by the kernel)
//!     → tls.rs (TLS 1.3 only, X25519 / secp256r1)
//!     → connection.rs (handshake, session logging)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Address-family isolation happens at bind time, not per request
//! - Any TLS version other than 1.3 fails the handshake
//! - TLS material is read once at startup; a load failure is fatal

pub mod connection;
pub mod listener;
pub mod tls;

pub use connection::{AddressFamily, SessionInfo, SessionLogAcceptor};
pub use listener::{bind_ipv6_only, ListenerError};
pub use tls::{load_tls_config, TlsError};
