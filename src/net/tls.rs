use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::digest::{digest, SHA256};
use std::path::Path;
use tracing::info;
use wtransport::Identity;

use crate::config::ServerConfig;

// Dev certificate paths (generated by scripts/gen-dev-cert.rs)
const DEV_CERT_FILE: &str = "certs/cert.pem";
const DEV_KEY_FILE: &str = "certs/key.pem";

/// TLS identity for the relay's WebTransport endpoint
pub struct TlsConfig {
    pub identity: Identity,
    /// Base64-encoded SHA-256 hash of the leaf certificate (for browser flag)
    pub cert_hash: String,
}

impl TlsConfig {
    /// Load the certificate named by the config, falling back to the dev
    /// certificate under certs/
    pub async fn load(config: &ServerConfig) -> Result<Self> {
        let (cert_path, key_path) = resolve_paths(config)?;
        info!(cert = %cert_path, "Loading TLS certificate");

        let identity = Identity::load_pemfiles(&cert_path, &key_path)
            .await
            .context("Failed to load certificate from PEM files")?;

        let cert_hash = identity
            .certificate_chain()
            .as_slice()
            .first()
            .map(|cert| cert_hash(cert.der()))
            .unwrap_or_default();
        info!("Certificate hash: {}", cert_hash);
        info!(
            "Chrome flag: --ignore-certificate-errors-spki-list={}",
            cert_hash
        );

        Ok(Self {
            identity,
            cert_hash,
        })
    }

    pub fn cert_hash(&self) -> &str {
        &self.cert_hash
    }
}

fn resolve_paths(config: &ServerConfig) -> Result<(String, String)> {
    if let (Some(cert), Some(key)) = (&config.tls_cert_path, &config.tls_key_path) {
        return Ok((cert.clone(), key.clone()));
    }

    if Path::new(DEV_CERT_FILE).exists() && Path::new(DEV_KEY_FILE).exists() {
        Ok((DEV_CERT_FILE.to_string(), DEV_KEY_FILE.to_string()))
    } else {
        Err(anyhow!(
            "TLS certificate not found.\n\n\
            For development: run `cargo run --manifest-path scripts/Cargo.toml` to generate certs/.\n\
            For production: set TLS_CERT_PATH and TLS_KEY_PATH."
        ))
    }
}

/// SHA-256 of a DER certificate, base64-encoded
fn cert_hash(der: &[u8]) -> String {
    STANDARD.encode(digest(&SHA256, der).as_ref())
}
