//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!     → logging.rs (EnvFilter → fmt layer → non-blocking stdout)
//!
//! Per connection:
//!     → net::connection logs version, cipher, address family, remote
//! Per request:
//!     → tower_http TraceLayer spans
//! ```

pub mod logging;

pub use logging::init_logging;
