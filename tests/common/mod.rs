//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum_server::Handle;
use rustls::pki_types::CertificateDer;
use rustls::RootCertStore;

use update_server::config::PkiConfig;
use update_server::http::HttpServer;
use update_server::lifecycle::bootstrap_certificates;
use update_server::net::{bind_ipv6_only, load_tls_config};
use update_server::pki::storage::{CA_CERT_FILE, LEAF_CERT_FILE, LEAF_KEY_FILE};

/// PKI settings rooted in `root`. The authority key is shrunk to 2048 bits
/// so tests do not spend seconds on prime generation.
pub fn fast_pki_config(root: &Path) -> PkiConfig {
    let mut pki = PkiConfig {
        cert_dir: root.join("certs"),
        key_dir: root.join("keys"),
        ..PkiConfig::default()
    };
    pki.profile.authority.key_bits = 2048;
    pki
}

/// Issue a fresh authority and leaf under `root`.
pub async fn issue_chain(root: &Path) -> PkiConfig {
    let pki = fast_pki_config(root);
    assert!(bootstrap_certificates(&pki).await.unwrap());
    pki
}

/// Create `<root>/updates` holding `app-1.0.bin` and a `secret` next to it.
pub fn populate_update_dir(root: &Path, payload: &[u8]) -> PathBuf {
    let update_dir = root.join("updates");
    std::fs::create_dir_all(&update_dir).unwrap();
    std::fs::write(update_dir.join("app-1.0.bin"), payload).unwrap();
    std::fs::write(root.join("secret"), b"top secret").unwrap();
    update_dir
}

/// A running HTTPS server bound for one test.
pub struct TestServer {
    pub addr: SocketAddr,
    pub handle: Handle,
    pub ca_pem: Vec<u8>,
}

impl TestServer {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self, path: &str) -> String {
        format!("https://[::1]:{}{}", self.port(), path)
    }

    /// Root store trusting only the generated authority.
    pub fn root_store(&self) -> RootCertStore {
        let mut roots = RootCertStore::empty();
        let certs: Vec<CertificateDer<'static>> =
            rustls_pemfile::certs(&mut self.ca_pem.as_slice())
                .collect::<Result<_, _>>()
                .unwrap();
        for cert in certs {
            roots.add(cert).unwrap();
        }
        roots
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}

/// Serve `update_dir` with the leaf from `pki` on `bind` (port 0 for ephemeral).
pub async fn start_server(pki: &PkiConfig, update_dir: &Path, bind: &str) -> TestServer {
    let tls = load_tls_config(
        &pki.cert_dir.join(LEAF_CERT_FILE),
        &pki.key_dir.join(LEAF_KEY_FILE),
    )
    .unwrap();
    let listener = bind_ipv6_only(bind.parse().unwrap()).unwrap();

    let handle = Handle::new();
    let server = HttpServer::new(update_dir, tls);
    let server_handle = handle.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_handle).await;
    });

    let addr = handle.listening().await.expect("server failed to start");
    let ca_pem = std::fs::read(pki.cert_dir.join(CA_CERT_FILE)).unwrap();

    TestServer {
        addr,
        handle,
        ca_pem,
    }
}

/// Client config trusting `roots`, restricted to `versions`.
pub fn client_config(
    roots: RootCertStore,
    versions: &[&'static rustls::SupportedProtocolVersion],
    provider: rustls::crypto::CryptoProvider,
) -> Arc<rustls::ClientConfig> {
    let config = rustls::ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(versions)
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Arc::new(config)
}

/// In-memory sink for `tracing_subscriber::fmt` output.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Subscriber writing plain-text INFO and above into this capture.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
