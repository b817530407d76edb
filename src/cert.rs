//! Self-signed TLS credentials for listening pools
//!
//! Generates a fresh ECDSA P-256 key pair and a one-year self-signed
//! certificate, and turns them into a rustls server configuration.

use crate::error::{PoolError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use rcgen::{
    CertificateParams, DnType, ExtendedKeyUsagePurpose, KeyPair, KeyUsagePurpose, SerialNumber,
};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tokio_rustls::rustls::crypto;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::rustls::ServerConfig;

/// Certificate validity period
const VALIDITY: Duration = Duration::days(365);

/// A generated certificate with its private key
pub struct SelfSignedCert {
    cert_der: CertificateDer<'static>,
    cert_pem: String,
    key_der: Vec<u8>,
}

impl std::fmt::Debug for SelfSignedCert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfSignedCert")
            .field("cert_len", &self.cert_der.len())
            .finish_non_exhaustive()
    }
}

impl SelfSignedCert {
    /// Generate a credential for `name`
    ///
    /// `name` becomes the subject organization and the only DNS subject
    /// alternative name, so verifying clients must dial with that hostname.
    pub fn generate(name: &str) -> Result<Self> {
        let key_pair = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).map_err(cert_error)?;

        let mut params = CertificateParams::new(vec![name.to_string()]).map_err(cert_error)?;
        params
            .distinguished_name
            .push(DnType::OrganizationName, name);
        params.serial_number = Some(random_serial());

        let now = OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + VALIDITY;
        params.key_usages = vec![
            KeyUsagePurpose::KeyEncipherment,
            KeyUsagePurpose::DigitalSignature,
        ];
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

        let cert = params.self_signed(&key_pair).map_err(cert_error)?;

        Ok(SelfSignedCert {
            cert_der: cert.der().clone(),
            cert_pem: cert.pem(),
            key_der: key_pair.serialize_der(),
        })
    }

    /// DER-encoded certificate
    pub fn cert_der(&self) -> &CertificateDer<'static> {
        &self.cert_der
    }

    /// PEM-encoded certificate, suitable as a client trust anchor
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// Build a server configuration presenting this certificate
    pub fn server_config(&self) -> Result<Arc<ServerConfig>> {
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key_der.clone()));
        let provider = Arc::new(crypto::ring::default_provider());

        let config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| PoolError::Config(format!("TLS setup failed: {}", e)))?
            .with_no_client_auth()
            .with_single_cert(vec![self.cert_der.clone()], key)
            .map_err(|e| PoolError::Config(format!("Invalid certificate: {}", e)))?;

        Ok(Arc::new(config))
    }
}

/// Positive 128-bit random serial number
fn random_serial() -> SerialNumber {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    bytes[0] &= 0x7f;
    SerialNumber::from_slice(&bytes)
}

fn cert_error(e: rcgen::Error) -> PoolError {
    PoolError::Config(format!("Certificate generation failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_cert() {
        let cert = SelfSignedCert::generate("linkpool").unwrap();
        assert!(!cert.cert_der().is_empty());
        assert!(cert.cert_pem().starts_with("-----BEGIN CERTIFICATE-----"));
    }

    #[test]
    fn test_generated_certs_differ() {
        let a = SelfSignedCert::generate("linkpool").unwrap();
        let b = SelfSignedCert::generate("linkpool").unwrap();
        assert_ne!(a.cert_der(), b.cert_der());
    }

    #[test]
    fn test_server_config() {
        let cert = SelfSignedCert::generate("localhost").unwrap();
        assert!(cert.server_config().is_ok());
    }

    #[test]
    fn test_random_serial_is_positive() {
        for _ in 0..16 {
            let bytes = random_serial().to_bytes();
            assert_eq!(bytes.len(), 16);
            assert!(bytes[0] < 0x80);
        }
    }
}
