//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Route log output through a non-blocking writer
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level configurable via `RUST_LOG`
//! - Writer is lossy when its buffer is full: a slow stdout drops lines
//!   instead of stalling connection handling

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "update_server=info,tower_http=info";

/// Install the global subscriber.
///
/// The returned guard flushes buffered lines on drop and must be held until
/// the process exits.
pub fn init_logging() -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    guard
}
