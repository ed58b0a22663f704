//! Self-signed certificate generation for local testing.
//!
//! Generates a CA and a CA-signed server certificate, and writes them as PEM
//! files the server can load, optionally with a password-protected key.
//! These certificates are NOT suitable for production use.

use crate::error::{Error, Result};
use pkcs8::{PrivateKeyInfo, der::pem::LineEnding, pkcs5::pbes2};
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, Issuer, KeyPair, SanType};
use std::{
    fs,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    path::{Path, PathBuf},
};

/// PBKDF2 rounds for encrypted test keys. Kept low so tests stay fast.
const PBKDF2_ITERATIONS: u32 = 2048;

/// Generated certificate material for TLS server.
#[derive(Clone)]
pub struct ServerCertificate {
    /// PEM-encoded certificate chain (server cert, then CA cert).
    pub cert_chain_pem: String,
    /// DER-encoded PKCS#8 private key.
    pub private_key_der: Vec<u8>,
    /// PEM-encoded unencrypted PKCS#8 private key.
    pub private_key_pem: String,
}

/// Paths of PEM files written by [`ServerCertificate::write_pem_files`].
#[derive(Debug, Clone)]
pub struct PemFiles {
    pub certificate: PathBuf,
    pub private_key: PathBuf,
}

/// Generated CA certificate for client verification.
pub struct CaCertificate {
    /// PEM-encoded CA certificate.
    pub cert_pem: String,
    key_pair: KeyPair,
    params: CertificateParams,
}

impl CaCertificate {
    /// Generate a new self-signed CA certificate.
    ///
    /// # Errors
    /// Returns an error if certificate generation fails.
    pub fn generate() -> Result<Self> {
        let mut params = CertificateParams::default();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params
            .distinguished_name
            .push(DnType::CommonName, "nul-echo test CA");
        params
            .distinguished_name
            .push(DnType::OrganizationName, "nul-echo");

        let key_pair = KeyPair::generate()?;
        let cert = params.self_signed(&key_pair)?;

        Ok(Self {
            cert_pem: cert.pem(),
            key_pair,
            params,
        })
    }

    /// Generate a server certificate signed by this CA.
    ///
    /// # Errors
    /// Returns an error if certificate generation fails.
    pub fn sign_server_cert(&self, server_name: &str) -> Result<ServerCertificate> {
        let mut params = CertificateParams::default();
        params
            .distinguished_name
            .push(DnType::CommonName, server_name);
        params.subject_alt_names = vec![
            SanType::DnsName(server_name.try_into()?),
            SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            SanType::IpAddress(IpAddr::V6(Ipv6Addr::LOCALHOST)),
        ];

        let server_key = KeyPair::generate()?;
        let issuer = Issuer::from_params(&self.params, &self.key_pair);
        let server_cert = params.signed_by(&server_key, &issuer)?;

        Ok(ServerCertificate {
            cert_chain_pem: format!("{}{}", server_cert.pem(), self.cert_pem),
            private_key_der: server_key.serialize_der(),
            private_key_pem: server_key.serialize_pem(),
        })
    }
}

impl ServerCertificate {
    /// Encode the private key as an `ENCRYPTED PRIVATE KEY` PEM block
    /// (PKCS#8, PBES2 with PBKDF2-SHA256 and AES-256-CBC).
    ///
    /// # Errors
    /// Returns an error if the key cannot be encrypted or encoded.
    pub fn encrypted_private_key_pem(&self, password: &str) -> Result<String> {
        let info = PrivateKeyInfo::try_from(self.private_key_der.as_slice()).map_err(Error::pkcs8)?;

        let salt = rand::random::<[u8; 16]>();
        let iv = rand::random::<[u8; 16]>();
        let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(PBKDF2_ITERATIONS, &salt, &iv)
            .map_err(Error::pkcs8)?;

        let document = info
            .encrypt_with_params(params, password)
            .map_err(Error::pkcs8)?;
        let pem = document
            .to_pem("ENCRYPTED PRIVATE KEY", LineEnding::LF)
            .map_err(Error::pkcs8)?;

        Ok(pem.as_str().to_owned())
    }

    /// Write `cert.pem` and `key.pem` into `dir`. With a password the key is
    /// written encrypted.
    ///
    /// # Errors
    /// Returns an error if encryption or a file write fails.
    pub fn write_pem_files(&self, dir: &Path, password: Option<&str>) -> Result<PemFiles> {
        let files = PemFiles {
            certificate: dir.join("cert.pem"),
            private_key: dir.join("key.pem"),
        };

        let key_pem = match password {
            Some(password) => self.encrypted_private_key_pem(password)?,
            None => self.private_key_pem.clone(),
        };

        fs::write(&files.certificate, &self.cert_chain_pem)?;
        fs::write(&files.private_key, key_pem)?;

        Ok(files)
    }
}

/// Generate a complete certificate pair (CA + server) for testing.
///
/// # Errors
/// Returns an error if certificate generation fails.
pub fn generate_test_certs(server_name: &str) -> Result<(CaCertificate, ServerCertificate)> {
    let ca = CaCertificate::generate()?;
    let server = ca.sign_server_cert(server_name)?;
    Ok((ca, server))
}
