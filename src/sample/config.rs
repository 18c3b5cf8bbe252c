//! Configuration management for the sample server
//!
//! Loaded from `config.toml` (or the file named by `FTPD_CONFIG`) with
//! `FTPD__SECTION__KEY` environment overrides.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::driver::Settings;

const DEFAULT_CONFIG_PATH: &str = "config";
const DEFAULT_WELCOME_MESSAGE: &str = "Welcome to ftpd";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Engine settings, handed over as-is by `ServerDriver::settings`.
    #[serde(default)]
    pub server: Settings,

    pub storage: StorageConfig,

    /// `AUTH TLS` is refused when absent.
    #[serde(default)]
    pub tls: Option<TlsFiles>,

    #[serde(default)]
    pub users: Vec<UserEntry>,

    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory served as `/`.
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TlsFiles {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UserEntry {
    pub name: String,
    pub password: String,
}

fn default_welcome_message() -> String {
    DEFAULT_WELCOME_MESSAGE.to_string()
}

impl AppConfig {
    /// Loads `FTPD_CONFIG` if set, `config.toml` otherwise.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("FTPD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let settings = Config::builder()
            .add_source(File::with_name(&path))
            .add_source(
                Environment::with_prefix("FTPD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.root.as_os_str().is_empty() {
            return Err(ConfigError::Message("storage.root cannot be empty".into()));
        }

        if self.users.is_empty() {
            return Err(ConfigError::Message(
                "at least one [[users]] entry is required".into(),
            ));
        }

        if self.users.iter().any(|user| user.name.is_empty()) {
            return Err(ConfigError::Message("user names cannot be empty".into()));
        }

        if let Some(tls) = &self.tls {
            if tls.cert_file.as_os_str().is_empty() || tls.key_file.as_os_str().is_empty() {
                return Err(ConfigError::Message(
                    "tls.cert_file and tls.key_file are both required".into(),
                ));
            }
        }

        Ok(())
    }
}
