//! HTTPS update server.
//!
//! Bootstraps a private certificate authority and a wildcard leaf
//! certificate, then serves a local folder over TLS 1.3 on an IPv6-only
//! listener.
//!
//! # Architecture Overview
//!
//! ```text
//!   first run                          every run
//!   ┌──────────────┐   PEM files   ┌──────────────────────────────────────┐
//!   │     pki      │──────────────▶│  net::tls (TLS 1.3, X25519, P-256)   │
//!   │ CA → leaf    │  certs/ keys/ └──────────────────┬───────────────────┘
//!   └──────────────┘                                  │
//!                                                     ▼
//!   Client ──IPv6──▶ net::listener ──▶ net::connection ──▶ http::server
//!                    (V6ONLY)          (session log)       /updates/<path>
//! ```

use std::path::PathBuf;

use axum_server::Handle;
use clap::Parser;

use update_server::config::{default_config_path, load_or_default};
use update_server::lifecycle::signals::spawn_signal_handler;
use update_server::lifecycle::{self, StartupOptions};
use update_server::observability::init_logging;

#[derive(Parser, Debug)]
#[command(name = "update-server", version, about = "HTTPS update server with a bootstrapped private CA")]
struct Args {
    /// Configuration file (defaults to env.conf beside the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not wait for operator confirmation; the update folder must not be empty
    #[arg(long)]
    no_wait: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let log_guard = init_logging();

    let config_path = args.config.unwrap_or_else(default_config_path);
    let config = load_or_default(&config_path);

    tracing::info!(
        env = %config.env,
        address = %config.http_server.address,
        port = config.http_server.port,
        update_dir = %config.http_server.update_dir.display(),
        "Configuration loaded"
    );

    let handle = Handle::new();
    spawn_signal_handler(handle.clone());

    let options = StartupOptions {
        no_wait: args.no_wait,
    };

    if let Err(e) = lifecycle::run(config, options, handle).await {
        tracing::error!(error = %e, "Fatal error");
        drop(log_guard);
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
}
