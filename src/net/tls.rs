//! TLS termination for the relay listener.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

use crate::config::TlsConfig;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("Certificate file not found: {0}")]
    MissingCertificate(String),

    #[error("Private key file not found: {0}")]
    MissingKey(String),

    #[error("Failed to load TLS material: {0}")]
    Load(#[from] std::io::Error),
}

/// Load the listener certificate and key (PEM).
pub async fn load_tls_config(tls: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    let cert_path = Path::new(&tls.cert_path);
    let key_path = Path::new(&tls.key_path);

    if !cert_path.exists() {
        return Err(TlsError::MissingCertificate(tls.cert_path.clone()));
    }
    if !key_path.exists() {
        return Err(TlsError::MissingKey(tls.key_path.clone()));
    }

    Ok(RustlsConfig::from_pem_file(cert_path, key_path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_files_are_reported_before_parsing() {
        let tls = TlsConfig {
            cert_path: "/no/such/cert.pem".into(),
            key_path: "/no/such/key.pem".into(),
        };
        let err = load_tls_config(&tls).await.unwrap_err();
        assert!(matches!(err, TlsError::MissingCertificate(ref p) if p == "/no/such/cert.pem"));
    }
}
