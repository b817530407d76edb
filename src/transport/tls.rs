//! TLS wrapping for pooled connections
//!
//! Client side follows the configured [`TlsMode`]; both TLS modes pin the
//! protocol to TLS 1.3. Server side applies one opaque credential to every
//! accepted connection.

use super::PooledConn;
use crate::config::TlsMode;
use crate::error::{PoolError, Result};
use std::io::{self, BufReader};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{self, CryptoProvider};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    self, version, ClientConfig, DigitallySignedStruct, RootCertStore, ServerConfig,
    SignatureScheme,
};
use tokio_rustls::{TlsAcceptor, TlsConnector};

/// Client-side TLS policy resolved from a [`TlsMode`]
#[derive(Clone)]
pub enum ClientTls {
    /// Connections are used as dialed
    Plaintext,
    /// Connections are TLS-wrapped before the ID exchange
    Tls {
        /// TLS connector
        connector: TlsConnector,
        /// Name to verify, `None` sends no SNI and addresses the peer by IP
        server_name: Option<ServerName<'static>>,
    },
}

impl std::fmt::Debug for ClientTls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientTls::Plaintext => f.write_str("Plaintext"),
            ClientTls::Tls { server_name, .. } => f
                .debug_struct("Tls")
                .field("server_name", server_name)
                .finish(),
        }
    }
}

impl ClientTls {
    /// Build the client policy for a TLS mode
    ///
    /// `trusted_root` names an extra PEM bundle added to the native roots
    /// in verified mode; it is ignored otherwise.
    pub fn from_mode(mode: &TlsMode, trusted_root: Option<&str>) -> Result<Self> {
        match mode {
            TlsMode::Plaintext => Ok(ClientTls::Plaintext),
            TlsMode::Opportunistic => {
                let provider = Arc::new(crypto::ring::default_provider());
                let config = ClientConfig::builder_with_provider(provider.clone())
                    .with_protocol_versions(&[&version::TLS13])
                    .map_err(|e| PoolError::Config(format!("TLS setup failed: {}", e)))?
                    .dangerous()
                    .with_custom_certificate_verifier(Arc::new(NoVerifier(provider)))
                    .with_no_client_auth();

                Ok(ClientTls::Tls {
                    connector: TlsConnector::from(Arc::new(config)),
                    server_name: None,
                })
            }
            TlsMode::Verified { hostname } => {
                let server_name = ServerName::try_from(hostname.clone()).map_err(|e| {
                    PoolError::Config(format!("Invalid hostname {}: {}", hostname, e))
                })?;

                let provider = Arc::new(crypto::ring::default_provider());
                let config = ClientConfig::builder_with_provider(provider)
                    .with_protocol_versions(&[&version::TLS13])
                    .map_err(|e| PoolError::Config(format!("TLS setup failed: {}", e)))?
                    .with_root_certificates(root_store(trusted_root)?)
                    .with_no_client_auth();

                Ok(ClientTls::Tls {
                    connector: TlsConnector::from(Arc::new(config)),
                    server_name: Some(server_name),
                })
            }
        }
    }

    /// Apply the policy to a freshly dialed stream
    pub async fn wrap(&self, stream: TcpStream) -> io::Result<PooledConn> {
        match self {
            ClientTls::Plaintext => Ok(Box::new(stream)),
            ClientTls::Tls {
                connector,
                server_name,
            } => {
                let name = match server_name {
                    Some(name) => name.clone(),
                    None => ServerName::IpAddress(stream.peer_addr()?.ip().into()),
                };
                let tls_stream = connector.connect(name, stream).await?;
                Ok(Box::new(tls_stream))
            }
        }
    }
}

/// Native roots plus an optional PEM bundle
fn root_store(trusted_root: Option<&str>) -> Result<RootCertStore> {
    let mut store = RootCertStore::empty();

    let native_certs = rustls_native_certs::load_native_certs();
    for cert in native_certs.certs {
        store.add(cert).ok();
    }

    if let Some(path) = trusted_root {
        let file = std::fs::File::open(path).map_err(|e| {
            PoolError::Config(format!("Failed to open certificate file {}: {}", path, e))
        })?;
        let mut reader = BufReader::new(file);
        let certs = rustls_pemfile::certs(&mut reader)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                PoolError::Config(format!("Failed to parse certificates from {}: {}", path, e))
            })?;
        if certs.is_empty() {
            return Err(PoolError::Config(format!("No certificates found in {}", path)));
        }
        for cert in certs {
            store
                .add(cert)
                .map_err(|e| PoolError::Config(format!("Failed to add certificate: {}", e)))?;
        }
    }

    Ok(store)
}

/// Accepts any server certificate but still checks handshake signatures
#[derive(Debug)]
struct NoVerifier(Arc<CryptoProvider>);

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

/// Server-side TLS credential applied to every accepted connection
#[derive(Clone)]
pub struct ServerTls {
    acceptor: TlsAcceptor,
}

impl std::fmt::Debug for ServerTls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerTls").finish_non_exhaustive()
    }
}

impl ServerTls {
    /// Wrap a server configuration
    pub fn new(config: Arc<ServerConfig>) -> Self {
        ServerTls {
            acceptor: TlsAcceptor::from(config),
        }
    }

    /// Perform the server handshake on an accepted stream
    pub async fn accept(&self, stream: TcpStream) -> io::Result<PooledConn> {
        let tls_stream = self.acceptor.accept(stream).await?;
        Ok(Box::new(tls_stream))
    }
}
