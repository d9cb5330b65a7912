//! Certificate issuance subsystem.
//!
//! # Data Flow
//! ```text
//! CertificateProfile (config)
//!     → issuer.rs generate_ca()        → Authority (signing context)
//!     → issuer.rs generate_leaf_cert() → leaf certificate
//!     → storage.rs (PEM blocks on disk)
//!
//! On disk:
//!     <cert_dir>/ca-root.crt   <key_dir>/ca-root.key
//!     <cert_dir>/wildcard.crt  <key_dir>/wildcard.key
//! ```
//!
//! # Design Decisions
//! - Issuance is synchronous and runs once, before the server starts
//! - The authority is an immutable value handed to leaf issuance by reference
//! - Serial numbers are random 127-bit integers, distinct between issuer and leaf
//! - Presence of the leaf certificate file is the only "already issued" signal

pub mod issuer;
pub mod profile;
pub mod storage;

use std::path::PathBuf;

use openssl::error::ErrorStack;

pub use issuer::{Authority, IssuedChain, Issuer};
pub use profile::{AuthorityProfile, CertificateProfile, LeafProfile, SubjectName};
pub use storage::PemStore;

/// Error type for certificate issuance and persistence.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    /// A key generation or signing operation failed.
    #[error("failed to {context}: {source}")]
    Generation {
        context: &'static str,
        #[source]
        source: ErrorStack,
    },

    /// The certificate profile cannot produce a valid template.
    #[error("invalid certificate template: {0}")]
    InvalidTemplate(String),

    /// A directory or file could not be created, written or read.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Leaf issuance was requested without authority material.
    #[error("authority material not found at {0}")]
    MissingAuthority(PathBuf),
}

impl IssueError {
    pub(crate) fn generation(context: &'static str) -> impl FnOnce(ErrorStack) -> Self {
        move |source| IssueError::Generation { context, source }
    }
}
