//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Listener must be IPv6
//! - Directories must be named
//! - Certificate profile must be a known version with sane key sizes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>

use crate::config::schema::ServerConfig;
use crate::pki::profile::PROFILE_VERSION;

const MIN_RSA_BITS: u32 = 2048;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("http_server.address {0:?} is not an IPv6 address")]
    NotIpv6(String),

    #[error("{0} must not be empty")]
    EmptyPath(&'static str),

    #[error("pki.profile.version {found} is not supported (expected {expected})")]
    UnsupportedProfileVersion { found: u32, expected: u32 },

    #[error("{field} of {bits} bits is below the {min}-bit minimum")]
    WeakKey {
        field: &'static str,
        bits: u32,
        min: u32,
    },
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.http_server.ipv6_address().is_err() {
        errors.push(ValidationError::NotIpv6(config.http_server.address.clone()));
    }

    let paths = [
        ("http_server.updateDir", &config.http_server.update_dir),
        ("pki.cert_dir", &config.pki.cert_dir),
        ("pki.key_dir", &config.pki.key_dir),
    ];
    for (field, path) in paths {
        if path.as_os_str().is_empty() {
            errors.push(ValidationError::EmptyPath(field));
        }
    }

    let profile = &config.pki.profile;
    if profile.version != PROFILE_VERSION {
        errors.push(ValidationError::UnsupportedProfileVersion {
            found: profile.version,
            expected: PROFILE_VERSION,
        });
    }
    let keys = [
        ("pki.profile.authority.key_bits", profile.authority.key_bits),
        ("pki.profile.leaf.key_bits", profile.leaf.key_bits),
    ];
    for (field, bits) in keys {
        if bits < MIN_RSA_BITS {
            errors.push(ValidationError::WeakKey {
                field,
                bits,
                min: MIN_RSA_BITS,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = ServerConfig::default();
        config.http_server.address = "127.0.0.1".to_string();
        config.http_server.update_dir = PathBuf::new();
        config.pki.profile.version = 7;
        config.pki.profile.leaf.key_bits = 1024;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::NotIpv6("127.0.0.1".to_string())));
        assert!(errors.contains(&ValidationError::EmptyPath("http_server.updateDir")));
    }
}
