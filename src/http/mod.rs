//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TLS connection (net layer)
//!     → server.rs (Axum router, request tracing)
//!     → /updates/<path> → ServeDir(<update_dir>)
//!     → anything else → 404
//! ```

pub mod server;

pub use server::{build_router, HttpServer, ServerError, UPDATES_PREFIX};
