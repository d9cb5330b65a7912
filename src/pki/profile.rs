//! Certificate profile definitions.
//!
//! The profile carries every input of the issuer other than randomness:
//! subject names, key sizes, validity periods and the leaf's subject
//! alternative names. Defaults describe the badssl.test deployment.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

/// Current profile schema version.
pub const PROFILE_VERSION: u32 = 1;

/// Versioned certificate profile for one authority and one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CertificateProfile {
    /// Schema version of this profile.
    pub version: u32,

    /// Root authority settings.
    pub authority: AuthorityProfile,

    /// Leaf (server) certificate settings.
    pub leaf: LeafProfile,
}

impl Default for CertificateProfile {
    fn default() -> Self {
        Self {
            version: PROFILE_VERSION,
            authority: AuthorityProfile::default(),
            leaf: LeafProfile::default(),
        }
    }
}

/// Distinguished name fields written into a certificate subject.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubjectName {
    pub country: String,
    pub organization: String,
    pub organizational_unit: String,
    pub common_name: String,
}

/// Root authority settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorityProfile {
    pub subject: SubjectName,

    /// RSA modulus size in bits.
    pub key_bits: u32,

    /// Validity period in calendar years from issuance.
    pub validity_years: u8,
}

impl Default for AuthorityProfile {
    fn default() -> Self {
        Self {
            subject: SubjectName {
                country: "US".to_string(),
                organization: "BadSSL Test CA".to_string(),
                organizational_unit: "IT Department".to_string(),
                common_name: "BadSSL Root CA".to_string(),
            },
            key_bits: 4096,
            validity_years: 10,
        }
    }
}

/// Leaf certificate settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LeafProfile {
    pub subject: SubjectName,

    /// RSA modulus size in bits.
    pub key_bits: u32,

    /// Validity period in calendar years from issuance.
    pub validity_years: u8,

    /// IP addresses placed in the subject alternative name extension.
    pub ip_addresses: Vec<IpAddr>,

    /// DNS names placed in the subject alternative name extension.
    pub dns_names: Vec<String>,
}

impl Default for LeafProfile {
    fn default() -> Self {
        Self {
            subject: SubjectName {
                country: "US".to_string(),
                organization: "BadSSL Test".to_string(),
                organizational_unit: "IT Department".to_string(),
                common_name: "localhost".to_string(),
            },
            key_bits: 2048,
            validity_years: 2,
            ip_addresses: vec![
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(Ipv6Addr::LOCALHOST),
            ],
            dns_names: [
                "localhost",
                "*.badssl.test",
                "badssl.test",
                "self-signed.badssl.test",
                "expired.badssl.test",
                "mixed.badssl.test",
                "rc4.badssl.test",
                "hsts.badssl.test",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let profile = CertificateProfile::default();
        assert_eq!(profile.version, PROFILE_VERSION);
        assert_eq!(profile.authority.subject.common_name, "BadSSL Root CA");
        assert_eq!(profile.authority.key_bits, 4096);
        assert_eq!(profile.leaf.key_bits, 2048);
        assert_eq!(profile.leaf.validity_years, 2);
        assert!(profile.leaf.dns_names.iter().any(|n| n == "*.badssl.test"));
        assert_eq!(profile.leaf.ip_addresses.len(), 2);
    }

    #[test]
    fn partial_profile_keeps_defaults() {
        let profile: CertificateProfile = toml::from_str(
            r#"
            [leaf]
            dns_names = ["updates.example.test"]
            "#,
        )
        .unwrap();

        assert_eq!(profile.leaf.dns_names, vec!["updates.example.test"]);
        assert_eq!(profile.leaf.key_bits, 2048);
        assert_eq!(profile.authority, AuthorityProfile::default());
    }
}
