//! HTTPS file server setup.
//!
//! # Responsibilities
//! - Create Axum Router exposing the update directory under `/updates/`
//! - Wire up request tracing
//! - Serve over the IPv6-only listener with the session-logging TLS acceptor
//!
//! Containment of requested paths inside the update directory is left to
//! `ServeDir`, which rejects `..` segments and never follows paths outside
//! its root.

use std::path::{Path, PathBuf};

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::net::SessionLogAcceptor;

/// URL prefix under which the update directory is served.
pub const UPDATES_PREFIX: &str = "/updates";

/// Error type for the serving phase.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("HTTPS server failed: {0}")]
    Serve(#[from] std::io::Error),
}

/// Build the router: `/updates/<path>` maps to `<update_dir>/<path>`.
pub fn build_router(update_dir: &Path) -> Router {
    Router::new()
        .nest_service(UPDATES_PREFIX, ServeDir::new(update_dir))
        .layer(TraceLayer::new_for_http())
}

/// HTTPS server for the update directory.
pub struct HttpServer {
    router: Router,
    tls: RustlsConfig,
    update_dir: PathBuf,
}

impl HttpServer {
    /// Create a new HTTPS server for `update_dir` using the given TLS configuration.
    pub fn new(update_dir: impl Into<PathBuf>, tls: RustlsConfig) -> Self {
        let update_dir = update_dir.into();
        let router = build_router(&update_dir);
        Self {
            router,
            tls,
            update_dir,
        }
    }

    pub fn update_dir(&self) -> &Path {
        &self.update_dir
    }

    /// Run the server on an already bound listener until `handle` shuts it down.
    pub async fn run(
        self,
        listener: std::net::TcpListener,
        handle: Handle,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            update_dir = %self.update_dir.display(),
            "HTTPS server starting"
        );

        let app = self.router.into_make_service();

        axum_server::from_tcp(listener)
            .acceptor(SessionLogAcceptor::new(self.tls))
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}
