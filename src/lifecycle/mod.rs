//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Banner → Bootstrap certificates → Update folder → Readiness gate
//!         → TLS config → IPv6 listener → Serve
//!
//! Readiness (readiness.rs):
//!     Operator presses Enter → folder has entries? → continue
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Graceful shutdown through the server handle
//! ```

pub mod readiness;
pub mod signals;
pub mod startup;

pub use startup::{bootstrap_certificates, run, StartupError, StartupOptions};
