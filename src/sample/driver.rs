//! `ServerDriver` backed by `AppConfig`.

use async_trait::async_trait;
use log::info;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::path::Path;
use std::sync::Arc;

use crate::driver::{ClientContext, ClientHandlingDriver, ServerDriver, Settings};
use crate::error::DriverError;
use crate::sample::config::{AppConfig, TlsFiles};
use crate::sample::fs::LocalFs;

pub struct SampleDriver {
    config: AppConfig,
}

impl SampleDriver {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[async_trait]
impl ServerDriver for SampleDriver {
    fn settings(&self) -> Settings {
        self.config.server.clone()
    }

    async fn welcome_user(&self, cc: &dyn ClientContext) -> Result<String, DriverError> {
        info!("Welcoming client {} from {}", cc.id(), cc.remote_addr());
        Ok(self.config.welcome_message.clone())
    }

    async fn user_left(&self, cc: &dyn ClientContext) {
        info!("Client {} ({}) left", cc.id(), cc.user());
    }

    async fn auth_user(
        &self,
        _cc: &dyn ClientContext,
        user: &str,
        pass: &str,
    ) -> Result<Arc<dyn ClientHandlingDriver>, DriverError> {
        let known = self
            .config
            .users
            .iter()
            .any(|entry| entry.name == user && entry.password == pass);
        if !known {
            return Err(DriverError::AuthenticationFailed(
                "bad user or password".into(),
            ));
        }
        Ok(Arc::new(LocalFs::new(self.config.storage.root.clone())))
    }

    async fn tls_config(&self) -> Result<Arc<rustls::ServerConfig>, DriverError> {
        match &self.config.tls {
            Some(files) => load_tls_config(files).await,
            None => Err(DriverError::TlsNotConfigured),
        }
    }
}

/// Reads the certificate chain and key from disk. Called per use so that
/// replaced files take effect without a restart.
pub async fn load_tls_config(files: &TlsFiles) -> Result<Arc<rustls::ServerConfig>, DriverError> {
    let certs = read_certs(&files.cert_file).await?;
    let key = read_key(&files.key_file).await?;

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| DriverError::Tls(e.to_string()))?
    .with_no_client_auth()
    .with_single_cert(certs, key)
    .map_err(|e| DriverError::Tls(e.to_string()))?;

    Ok(Arc::new(config))
}

async fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, DriverError> {
    let pem = tokio::fs::read(path).await?;
    let certs = rustls_pemfile::certs(&mut &pem[..]).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(DriverError::Tls(format!(
            "no certificate found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

async fn read_key(path: &Path) -> Result<PrivateKeyDer<'static>, DriverError> {
    let pem = tokio::fs::read(path).await?;
    rustls_pemfile::private_key(&mut &pem[..])?
        .ok_or_else(|| DriverError::Tls(format!("no private key found in {}", path.display())))
}
