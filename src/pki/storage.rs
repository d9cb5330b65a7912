//! PEM persistence for certificates, private keys and revocation lists.
//!
//! Every file is written to a temporary sibling and renamed into place, so a
//! reader never sees a partial block. Private keys are created with mode 0600
//! on unix.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use pem::{EncodeConfig, LineEnding, Pem};

use crate::pki::IssueError;

/// Authority certificate file name (inside the certificate directory).
pub const CA_CERT_FILE: &str = "ca-root.crt";
/// Authority private key file name (inside the key directory).
pub const CA_KEY_FILE: &str = "ca-root.key";
/// Leaf certificate file name (inside the certificate directory).
pub const LEAF_CERT_FILE: &str = "wildcard.crt";
/// Leaf private key file name (inside the key directory).
pub const LEAF_KEY_FILE: &str = "wildcard.key";

/// PEM label of an X.509 certificate.
pub const CERTIFICATE_TAG: &str = "CERTIFICATE";
/// PEM label of a PKCS#1 RSA private key.
pub const RSA_PRIVATE_KEY_TAG: &str = "RSA PRIVATE KEY";
/// PEM label of a certificate revocation list.
pub const X509_CRL_TAG: &str = "X509 CRL";

/// Writes PEM artifacts into a certificate directory and a key directory.
#[derive(Debug, Clone)]
pub struct PemStore {
    cert_dir: PathBuf,
    key_dir: PathBuf,
}

impl PemStore {
    pub fn new(cert_dir: impl Into<PathBuf>, key_dir: impl Into<PathBuf>) -> Self {
        Self {
            cert_dir: cert_dir.into(),
            key_dir: key_dir.into(),
        }
    }

    pub fn cert_dir(&self) -> &Path {
        &self.cert_dir
    }

    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    /// Path of a file inside the certificate directory.
    pub fn cert_path(&self, name: &str) -> PathBuf {
        self.cert_dir.join(name)
    }

    /// Path of a file inside the key directory.
    pub fn key_path(&self, name: &str) -> PathBuf {
        self.key_dir.join(name)
    }

    /// Create both directories if they are missing.
    pub fn ensure_dirs(&self) -> Result<(), IssueError> {
        for dir in [&self.cert_dir, &self.key_dir] {
            fs::create_dir_all(dir).map_err(|source| IssueError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Persist a DER certificate as a `CERTIFICATE` block.
    pub fn save_cert(&self, name: &str, der: &[u8]) -> Result<PathBuf, IssueError> {
        write_pem_block(&self.cert_path(name), CERTIFICATE_TAG, der)
    }

    /// Persist a PKCS#1 DER private key as an `RSA PRIVATE KEY` block.
    pub fn save_key(&self, name: &str, pkcs1_der: &[u8]) -> Result<PathBuf, IssueError> {
        write_pem_file(&self.key_path(name), RSA_PRIVATE_KEY_TAG, pkcs1_der, FileMode::Private)
    }

    /// Persist a DER revocation list as an `X509 CRL` block.
    ///
    /// The certificate directory is created on demand.
    pub fn save_crl(&self, name: &str, der: &[u8]) -> Result<PathBuf, IssueError> {
        fs::create_dir_all(&self.cert_dir).map_err(|source| IssueError::Io {
            path: self.cert_dir.clone(),
            source,
        })?;
        write_pem_block(&self.cert_path(name), X509_CRL_TAG, der)
    }
}

/// Permission class of a written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileMode {
    /// Default permissions (subject to umask).
    Public,
    /// Owner read/write only.
    Private,
}

/// Encode `contents` as a single PEM block labelled `tag` and write it to `path`.
pub fn write_pem_block(path: &Path, tag: &str, contents: &[u8]) -> Result<PathBuf, IssueError> {
    write_pem_file(path, tag, contents, FileMode::Public)
}

fn write_pem_file(
    path: &Path,
    tag: &str,
    contents: &[u8],
    mode: FileMode,
) -> Result<PathBuf, IssueError> {
    let block = Pem::new(tag, contents);
    let encoded = pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF));

    let tmp = temp_sibling(path);
    let result = write_file(&tmp, encoded.as_bytes(), mode)
        .map_err(|source| IssueError::Io {
            path: tmp.clone(),
            source,
        })
        .and_then(|()| {
            fs::rename(&tmp, path).map_err(|source| IssueError::Io {
                path: path.to_path_buf(),
                source,
            })
        });

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result?;

    tracing::debug!(path = %path.display(), tag, private = mode == FileMode::Private, "PEM block written");
    Ok(path.to_path_buf())
}

/// `dir/.name.tmp` next to `path`, so the final rename stays on one filesystem.
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pem".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

fn write_file(path: &Path, contents: &[u8], mode: FileMode) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if mode == FileMode::Private {
            options.mode(0o600);
        }
    }

    let mut file = options.open(path)?;

    // `mode` only applies on creation; a leftover temp file keeps its old bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if mode == FileMode::Private {
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
    }

    file.write_all(contents)?;
    file.sync_all()
}
