//! Startup orchestration.
//!
//! # Responsibilities
//! - Print the banner
//! - Issue certificates on first run
//! - Prepare the update directory and pass the readiness gate
//! - Load TLS material, bind the IPv6-only listener and serve
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Steps run in order, not concurrently
//! - The listener binds last (traffic only when ready)

use std::path::PathBuf;

use axum_server::Handle;

use crate::config::{PkiConfig, ServerConfig};
use crate::http::{HttpServer, ServerError, UPDATES_PREFIX};
use crate::lifecycle::readiness::{
    dir_has_entries, ensure_update_dir, spawn_stdin_feeder, wait_until_ready, ReadinessError,
};
use crate::net::{bind_ipv6_only, load_tls_config, ListenerError, TlsError};
use crate::pki::storage::{LEAF_CERT_FILE, LEAF_KEY_FILE};
use crate::pki::{IssueError, Issuer, PemStore};

/// Error type for startup. Every variant is fatal.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("certificate generation failed: {0}")]
    Issue(#[from] IssueError),

    #[error("certificate generation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("cannot prepare update folder {path}: {source}")]
    UpdateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    #[error("update folder {0} is empty; place files in it before starting with --no-wait")]
    NotReady(PathBuf),

    #[error("listen address {0:?} is not an IPv6 address")]
    InvalidAddress(String),

    #[error("failed to bind IPv6 listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("failed to load TLS material: {0}")]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Switches that change startup behavior without touching the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartupOptions {
    /// Skip the operator prompt. The update folder must already have content.
    pub no_wait: bool,
}

/// Log the startup banner.
pub fn log_banner() {
    tracing::info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Update Server"
    );
    tracing::info!("============================");
}

/// Issue the authority and leaf unless `<cert_dir>/wildcard.crt` already exists.
///
/// Returns `true` when new material was generated. Existing material is
/// never inspected or replaced.
pub async fn bootstrap_certificates(pki: &PkiConfig) -> Result<bool, StartupError> {
    let store = PemStore::new(pki.cert_dir.clone(), pki.key_dir.clone());
    let leaf_cert = store.cert_path(LEAF_CERT_FILE);

    if leaf_cert.exists() {
        tracing::info!(
            path = %leaf_cert.display(),
            "Existing leaf certificate found, skipping generation"
        );
        return Ok(false);
    }

    tracing::info!(
        cert_dir = %pki.cert_dir.display(),
        key_dir = %pki.key_dir.display(),
        "Generating certificate authority and leaf certificate"
    );

    let issuer = Issuer::new(store, pki.profile.clone());
    tokio::task::spawn_blocking(move || issuer.generate_all()).await??;

    Ok(true)
}

/// Run the full startup sequence, then serve until `handle` shuts down.
pub async fn run(
    config: ServerConfig,
    options: StartupOptions,
    handle: Handle,
) -> Result<(), StartupError> {
    log_banner();

    bootstrap_certificates(&config.pki).await?;

    let update_dir = config.http_server.update_dir.clone();
    ensure_update_dir(&update_dir).map_err(|source| StartupError::UpdateDir {
        path: update_dir.clone(),
        source,
    })?;

    if options.no_wait {
        let ready = dir_has_entries(&update_dir).map_err(|source| StartupError::UpdateDir {
            path: update_dir.clone(),
            source,
        })?;
        if !ready {
            return Err(StartupError::NotReady(update_dir));
        }
    } else {
        wait_until_ready(&update_dir, spawn_stdin_feeder()).await?;
    }

    let store = PemStore::new(config.pki.cert_dir.clone(), config.pki.key_dir.clone());
    let tls = load_tls_config(
        &store.cert_path(LEAF_CERT_FILE),
        &store.key_path(LEAF_KEY_FILE),
    )?;

    let addr = config
        .http_server
        .bind_addr()
        .ok_or_else(|| StartupError::InvalidAddress(config.http_server.address.clone()))?;
    let listener = bind_ipv6_only(addr)?;
    let port = listener
        .local_addr()
        .map(|bound| bound.port())
        .unwrap_or(addr.port());

    tracing::info!("HTTPS update server started on https://[::1]:{}", port);
    tracing::info!(
        "Files are available at: https://[::1]:{}{}/",
        port,
        UPDATES_PREFIX
    );

    HttpServer::new(update_dir, tls).run(listener, handle).await?;
    Ok(())
}
