//! Root authority and leaf certificate issuance.
//!
//! # Certificate Properties
//! - **Authority**: self-signed, CA=true (critical), key usage
//!   digitalSignature | keyEncipherment | keyCertSign | cRLSign,
//!   extended key usage serverAuth
//! - **Leaf**: signed by the authority, CA=false, key usage
//!   digitalSignature | keyEncipherment, extended key usage serverAuth,
//!   subject alternative names from the profile
//! - Both: X.509v3, SHA-256 with RSA, random serial number

use std::fs;

use openssl::asn1::{Asn1Integer, Asn1IntegerRef, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage,
    SubjectAlternativeName, SubjectKeyIdentifier,
};
use openssl::x509::{X509Builder, X509Name, X509Ref, X509};
use time::{Duration, OffsetDateTime};

use crate::pki::profile::{CertificateProfile, SubjectName};
use crate::pki::storage::{PemStore, CA_CERT_FILE, CA_KEY_FILE, LEAF_CERT_FILE, LEAF_KEY_FILE};
use crate::pki::IssueError;

const X509_VERSION_3: i32 = 2;
const SERIAL_BITS: i32 = 127;

/// Signing context produced by [`Issuer::generate_ca`].
///
/// Holds the authority certificate and private key. Leaf issuance borrows it,
/// so a leaf can never be requested before an authority exists.
pub struct Authority {
    certificate: X509,
    private_key: PKey<Private>,
}

impl Authority {
    /// Load authority material previously written by [`Issuer::generate_ca`].
    pub fn load(store: &PemStore) -> Result<Self, IssueError> {
        let cert_path = store.cert_path(CA_CERT_FILE);
        let key_path = store.key_path(CA_KEY_FILE);

        for path in [&cert_path, &key_path] {
            if !path.exists() {
                return Err(IssueError::MissingAuthority(path.clone()));
            }
        }

        let read = |path: &std::path::Path| {
            fs::read(path).map_err(|source| IssueError::Io {
                path: path.to_path_buf(),
                source,
            })
        };

        let certificate = X509::from_pem(&read(&cert_path)?)
            .map_err(IssueError::generation("parse authority certificate"))?;
        let private_key = PKey::private_key_from_pem(&read(&key_path)?)
            .map_err(IssueError::generation("parse authority private key"))?;

        Ok(Self {
            certificate,
            private_key,
        })
    }

    pub fn certificate(&self) -> &X509Ref {
        &self.certificate
    }

    pub fn private_key(&self) -> &PKeyRef<Private> {
        &self.private_key
    }
}

impl std::fmt::Debug for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authority")
            .field("subject", &self.certificate.subject_name())
            .finish_non_exhaustive()
    }
}

/// Result of a full issuance run.
#[derive(Debug)]
pub struct IssuedChain {
    pub authority: Authority,
    pub leaf: X509,
}

/// Builds and persists the authority and leaf certificates.
#[derive(Debug, Clone)]
pub struct Issuer {
    store: PemStore,
    profile: CertificateProfile,
}

impl Issuer {
    pub fn new(store: PemStore, profile: CertificateProfile) -> Self {
        Self { store, profile }
    }

    pub fn store(&self) -> &PemStore {
        &self.store
    }

    /// Generate the self-signed root authority and persist it.
    pub fn generate_ca(&self) -> Result<Authority, IssueError> {
        let profile = &self.profile.authority;
        tracing::info!(
            common_name = %profile.subject.common_name,
            key_bits = profile.key_bits,
            "Generating root authority"
        );

        self.store.ensure_dirs()?;

        let private_key = generate_key(profile.key_bits)?;
        let name = build_name(&profile.subject)?;

        let mut builder = start_certificate(&private_key, profile.validity_years, None)?;
        builder
            .set_subject_name(&name)
            .map_err(IssueError::generation("set subject"))?;
        builder
            .set_issuer_name(&name)
            .map_err(IssueError::generation("set issuer"))?;

        let bc = BasicConstraints::new()
            .critical()
            .ca()
            .build()
            .map_err(IssueError::generation("build BasicConstraints"))?;
        builder
            .append_extension(bc)
            .map_err(IssueError::generation("add BasicConstraints"))?;

        let ku = KeyUsage::new()
            .critical()
            .digital_signature()
            .key_encipherment()
            .key_cert_sign()
            .crl_sign()
            .build()
            .map_err(IssueError::generation("build KeyUsage"))?;
        builder
            .append_extension(ku)
            .map_err(IssueError::generation("add KeyUsage"))?;

        append_server_auth(&mut builder)?;

        let skid = SubjectKeyIdentifier::new()
            .build(&builder.x509v3_context(None, None))
            .map_err(IssueError::generation("build SubjectKeyIdentifier"))?;
        builder
            .append_extension(skid)
            .map_err(IssueError::generation("add SubjectKeyIdentifier"))?;

        builder
            .sign(&private_key, MessageDigest::sha256())
            .map_err(IssueError::generation("sign authority certificate"))?;
        let certificate = builder.build();

        self.persist(CA_CERT_FILE, CA_KEY_FILE, &certificate, &private_key)?;
        tracing::info!(
            cert = %self.store.cert_path(CA_CERT_FILE).display(),
            "Root authority created"
        );

        Ok(Authority {
            certificate,
            private_key,
        })
    }

    /// Generate the leaf certificate signed by `authority` and persist it.
    pub fn generate_leaf_cert(&self, authority: &Authority) -> Result<X509, IssueError> {
        let profile = &self.profile.leaf;
        if profile.ip_addresses.is_empty() && profile.dns_names.is_empty() {
            return Err(IssueError::InvalidTemplate(
                "leaf profile has no subject alternative names".to_string(),
            ));
        }

        tracing::info!(
            common_name = %profile.subject.common_name,
            key_bits = profile.key_bits,
            dns_names = profile.dns_names.len(),
            ip_addresses = profile.ip_addresses.len(),
            "Generating leaf certificate"
        );

        self.store.ensure_dirs()?;

        let private_key = generate_key(profile.key_bits)?;
        let name = build_name(&profile.subject)?;

        let mut builder = start_certificate(
            &private_key,
            profile.validity_years,
            Some(authority.certificate().serial_number()),
        )?;
        builder
            .set_subject_name(&name)
            .map_err(IssueError::generation("set subject"))?;
        builder
            .set_issuer_name(authority.certificate().subject_name())
            .map_err(IssueError::generation("set issuer from authority"))?;

        let bc = BasicConstraints::new()
            .critical()
            .build()
            .map_err(IssueError::generation("build BasicConstraints"))?;
        builder
            .append_extension(bc)
            .map_err(IssueError::generation("add BasicConstraints"))?;

        let ku = KeyUsage::new()
            .critical()
            .digital_signature()
            .key_encipherment()
            .build()
            .map_err(IssueError::generation("build KeyUsage"))?;
        builder
            .append_extension(ku)
            .map_err(IssueError::generation("add KeyUsage"))?;

        append_server_auth(&mut builder)?;

        let mut san = SubjectAlternativeName::new();
        for ip in &profile.ip_addresses {
            san.ip(&ip.to_string());
        }
        for dns in &profile.dns_names {
            san.dns(dns);
        }
        let san = san
            .build(&builder.x509v3_context(Some(authority.certificate()), None))
            .map_err(IssueError::generation("build SubjectAlternativeName"))?;
        builder
            .append_extension(san)
            .map_err(IssueError::generation("add SubjectAlternativeName"))?;

        let akid = AuthorityKeyIdentifier::new()
            .keyid(false)
            .build(&builder.x509v3_context(Some(authority.certificate()), None))
            .map_err(IssueError::generation("build AuthorityKeyIdentifier"))?;
        builder
            .append_extension(akid)
            .map_err(IssueError::generation("add AuthorityKeyIdentifier"))?;

        builder
            .sign(authority.private_key(), MessageDigest::sha256())
            .map_err(IssueError::generation("sign leaf certificate"))?;
        let certificate = builder.build();

        if let Err(e) = self.persist(LEAF_CERT_FILE, LEAF_KEY_FILE, &certificate, &private_key) {
            // A leftover leaf certificate would make bootstrap skip the retry
            // and pair an old certificate with a new key.
            let _ = fs::remove_file(self.store.cert_path(LEAF_CERT_FILE));
            return Err(e);
        }
        tracing::info!(
            cert = %self.store.cert_path(LEAF_CERT_FILE).display(),
            "Leaf certificate created"
        );

        Ok(certificate)
    }

    /// Generate the authority, then the leaf. Stops at the first failure.
    pub fn generate_all(&self) -> Result<IssuedChain, IssueError> {
        tracing::info!(
            cert_dir = %self.store.cert_dir().display(),
            key_dir = %self.store.key_dir().display(),
            "Generating certificate chain"
        );

        let authority = self.generate_ca()?;
        let leaf = self.generate_leaf_cert(&authority)?;

        Ok(IssuedChain { authority, leaf })
    }

    fn persist(
        &self,
        cert_file: &str,
        key_file: &str,
        certificate: &X509Ref,
        private_key: &PKeyRef<Private>,
    ) -> Result<(), IssueError> {
        let cert_der = certificate
            .to_der()
            .map_err(IssueError::generation("encode certificate"))?;
        let key_der = private_key
            .rsa()
            .and_then(|rsa| rsa.private_key_to_der())
            .map_err(IssueError::generation("encode private key"))?;

        // The certificate marks a completed step, so it goes last.
        self.store.save_key(key_file, &key_der)?;
        self.store.save_cert(cert_file, &cert_der)?;
        Ok(())
    }
}

fn generate_key(bits: u32) -> Result<PKey<Private>, IssueError> {
    let rsa = Rsa::generate(bits).map_err(IssueError::generation("generate RSA key pair"))?;
    PKey::from_rsa(rsa).map_err(IssueError::generation("wrap RSA key pair"))
}

fn build_name(subject: &SubjectName) -> Result<X509Name, IssueError> {
    let mut name = X509Name::builder().map_err(IssueError::generation("create name builder"))?;

    let entries = [
        (Nid::COUNTRYNAME, &subject.country),
        (Nid::ORGANIZATIONNAME, &subject.organization),
        (Nid::ORGANIZATIONALUNITNAME, &subject.organizational_unit),
        (Nid::COMMONNAME, &subject.common_name),
    ];
    for (nid, value) in entries {
        if value.is_empty() {
            continue;
        }
        name.append_entry_by_nid(nid, value)
            .map_err(IssueError::generation("append subject entry"))?;
    }

    Ok(name.build())
}

/// Builder with version, serial, validity window and public key already set.
fn start_certificate(
    key: &PKeyRef<Private>,
    validity_years: u8,
    issuer_serial: Option<&Asn1IntegerRef>,
) -> Result<X509Builder, IssueError> {
    let mut builder = X509::builder().map_err(IssueError::generation("create X509 builder"))?;
    builder
        .set_version(X509_VERSION_3)
        .map_err(IssueError::generation("set version"))?;

    let serial = random_serial(issuer_serial)?;
    builder
        .set_serial_number(&serial)
        .map_err(IssueError::generation("set serial number"))?;

    let now = OffsetDateTime::now_utc();
    let not_before = Asn1Time::from_unix(now.unix_timestamp())
        .map_err(IssueError::generation("create not_before"))?;
    let not_after = Asn1Time::from_unix(add_years(now, validity_years)?.unix_timestamp())
        .map_err(IssueError::generation("create not_after"))?;
    builder
        .set_not_before(&not_before)
        .map_err(IssueError::generation("set not_before"))?;
    builder
        .set_not_after(&not_after)
        .map_err(IssueError::generation("set not_after"))?;

    builder
        .set_pubkey(key)
        .map_err(IssueError::generation("set public key"))?;

    Ok(builder)
}

fn append_server_auth(builder: &mut X509Builder) -> Result<(), IssueError> {
    let eku = ExtendedKeyUsage::new()
        .server_auth()
        .build()
        .map_err(IssueError::generation("build ExtendedKeyUsage"))?;
    builder
        .append_extension(eku)
        .map_err(IssueError::generation("add ExtendedKeyUsage"))
}

/// Random positive serial, never equal to `avoid`.
fn random_serial(avoid: Option<&Asn1IntegerRef>) -> Result<Asn1Integer, IssueError> {
    let avoid = avoid
        .map(|serial| serial.to_bn())
        .transpose()
        .map_err(IssueError::generation("read issuer serial"))?;

    loop {
        let mut serial = BigNum::new().map_err(IssueError::generation("allocate serial"))?;
        serial
            .rand(SERIAL_BITS, MsbOption::ONE, false)
            .map_err(IssueError::generation("generate serial"))?;

        if avoid.as_ref().is_some_and(|taken| *taken == serial) {
            continue;
        }
        return serial
            .to_asn1_integer()
            .map_err(IssueError::generation("encode serial"));
    }
}

/// Same calendar position `years` later; 29 February rolls over to 1 March.
fn add_years(start: OffsetDateTime, years: u8) -> Result<OffsetDateTime, IssueError> {
    let year = start.year() + i32::from(years);
    start
        .replace_year(year)
        .or_else(|_| {
            start
                .replace_day(28)
                .and_then(|day| day.replace_year(year))
                .map(|day| day + Duration::days(1))
        })
        .map_err(|e| IssueError::InvalidTemplate(format!("validity end out of range: {e}")))
}
