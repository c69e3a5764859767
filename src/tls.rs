//! PEM loading and tonic TLS configuration for the gRPC endpoint.
//!
//! The server always runs mTLS when TLS is on. Clients need the CA to verify
//! the server and, for mTLS, their own certificate and key.

use std::path::{Path, PathBuf};

use tokio::fs;
use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};

use crate::config::TlsConfig;

/// Name the server certificate must be issued for. Clients connect by
/// address, so verification is pinned to this name instead of the host.
pub const TLS_DOMAIN: &str = "jobdock";

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("CA certificate path not configured")]
    MissingCaCert,

    #[error("Certificate path not configured")]
    MissingCert,

    #[error("Private key path not configured")]
    MissingKey,

    #[error("TLS file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, TlsError> {
    if !path.exists() {
        return Err(TlsError::NotFound(path.to_path_buf()));
    }
    Ok(fs::read(path).await?)
}

/// Server-side TLS materials.
#[derive(Clone)]
pub struct TlsIdentity {
    identity: Identity,
    ca_cert: Certificate,
}

impl TlsIdentity {
    /// Load the CA, certificate and key named in `config`.
    pub async fn load(config: &TlsConfig) -> Result<Self, TlsError> {
        let ca_path = config
            .ca_cert_path
            .as_deref()
            .ok_or(TlsError::MissingCaCert)?;
        let cert_path = config.cert_path.as_deref().ok_or(TlsError::MissingCert)?;
        let key_path = config.key_path.as_deref().ok_or(TlsError::MissingKey)?;

        let ca_cert = Certificate::from_pem(read_pem(ca_path).await?);
        let identity = Identity::from_pem(read_pem(cert_path).await?, read_pem(key_path).await?);

        Ok(Self { identity, ca_cert })
    }

    /// Server config that requires client certificates signed by the CA.
    pub fn server_tls_config(&self) -> ServerTlsConfig {
        ServerTlsConfig::new()
            .identity(self.identity.clone())
            .client_ca_root(self.ca_cert.clone())
    }
}

/// Client config verifying the server against `ca_cert`, presenting
/// `cert`/`key` when both are given.
pub async fn client_tls_config(
    ca_cert: Option<&Path>,
    cert: Option<&Path>,
    key: Option<&Path>,
) -> Result<ClientTlsConfig, TlsError> {
    let mut tls = ClientTlsConfig::new().domain_name(TLS_DOMAIN);

    if let Some(ca_path) = ca_cert {
        tls = tls.ca_certificate(Certificate::from_pem(read_pem(ca_path).await?));
    }

    match (cert, key) {
        (Some(cert_path), Some(key_path)) => {
            let identity =
                Identity::from_pem(read_pem(cert_path).await?, read_pem(key_path).await?);
            tls = tls.identity(identity);
        }
        (Some(_), None) => return Err(TlsError::MissingKey),
        (None, Some(_)) => return Err(TlsError::MissingCert),
        (None, None) => {}
    }

    Ok(tls)
}
