//! Configuration schema definitions.
//!
//! Every section has defaults, so an absent or partial file still yields a
//! complete configuration.

use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::pki::CertificateProfile;

/// Root configuration for the update server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Deployment label (informational only).
    pub env: String,

    /// HTTPS listener and served directory.
    pub http_server: HttpServerConfig,

    /// Certificate locations and issuance profile.
    pub pki: PkiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            env: "local".to_string(),
            http_server: HttpServerConfig::default(),
            pki: PkiConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpServerConfig {
    /// IPv6 bind address, brackets optional (e.g. "[::]" or "::1").
    pub address: String,

    /// TCP port. Accepts `443` or the legacy `":443"` form.
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,

    /// Directory exposed under `/updates/`.
    #[serde(rename = "updateDir")]
    pub update_dir: PathBuf,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            address: "[::]".to_string(),
            port: 443,
            update_dir: PathBuf::from("updates"),
        }
    }
}

impl HttpServerConfig {
    /// Parse `address` as an IPv6 address.
    pub fn ipv6_address(&self) -> Result<Ipv6Addr, std::net::AddrParseError> {
        self.address
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse()
    }

    /// Socket address to bind, or `None` when `address` is not IPv6.
    pub fn bind_addr(&self) -> Option<SocketAddr> {
        self.ipv6_address()
            .ok()
            .map(|ip| SocketAddr::V6(SocketAddrV6::new(ip, self.port, 0, 0)))
    }
}

/// Certificate locations and issuance profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PkiConfig {
    /// Directory holding `ca-root.crt` and `wildcard.crt`.
    pub cert_dir: PathBuf,

    /// Directory holding `ca-root.key` and `wildcard.key`.
    pub key_dir: PathBuf,

    /// Subject names, key sizes, validity and SAN list.
    pub profile: CertificateProfile,
}

impl Default for PkiConfig {
    fn default() -> Self {
        Self {
            cert_dir: PathBuf::from("certs"),
            key_dir: PathBuf::from("keys"),
            profile: CertificateProfile::default(),
        }
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        Text(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(port) => Ok(port),
        PortValue::Text(text) => text
            .trim()
            .trim_start_matches(':')
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port: {text:?}"))),
    }
}
