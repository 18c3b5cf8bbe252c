//! Server configuration
//!
//! Resolves the driver-supplied `Settings` into the effective configuration,
//! applying the engine defaults.

use std::net::IpAddr;
use std::time::Duration;

use crate::driver::Settings;

pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 2121;
pub const DEFAULT_MAX_CONNECTIONS: usize = 10_000;
pub const DEFAULT_DATA_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Effective server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen_host: String,
    pub listen_port: u16,
    /// Address announced by `PASV`; the control connection's local address
    /// is used when unset.
    pub public_host: Option<IpAddr>,
    pub max_connections: usize,
    pub idle_timeout: Option<Duration>,
    pub data_connection_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_settings(Settings::default())
    }
}

impl ServerConfig {
    /// Applies defaults to every field the driver left unset, empty or zero.
    pub fn from_settings(settings: Settings) -> Self {
        let listen_host = settings
            .listen_host
            .filter(|host| !host.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LISTEN_HOST.to_string());

        let public_host = settings.public_host.and_then(|host| {
            let host = host.trim();
            if host.is_empty() {
                return None;
            }
            match host.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    log::warn!("Ignoring public host {:?}: only IP addresses are accepted", host);
                    None
                }
            }
        });

        Self {
            listen_host,
            listen_port: settings.listen_port.unwrap_or(DEFAULT_LISTEN_PORT),
            public_host,
            max_connections: settings
                .max_connections
                .filter(|max| *max > 0)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            idle_timeout: settings
                .idle_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            data_connection_timeout: Duration::from_secs(
                settings
                    .data_connection_timeout_secs
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_DATA_CONNECTION_TIMEOUT_SECS),
            ),
        }
    }

    /// `host:port` string for the control listener.
    pub fn control_socket(&self) -> String {
        if self.listen_host.contains(':') {
            format!("[{}]:{}", self.listen_host, self.listen_port)
        } else {
            format!("{}:{}", self.listen_host, self.listen_port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_settings_get_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_host, "0.0.0.0");
        assert_eq!(config.listen_port, 2121);
        assert_eq!(config.max_connections, 10_000);
        assert_eq!(config.public_host, None);
        assert_eq!(config.idle_timeout, None);
        assert_eq!(config.data_connection_timeout, Duration::from_secs(30));
        assert_eq!(config.control_socket(), "0.0.0.0:2121");
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let config = ServerConfig::from_settings(Settings {
            listen_host: Some(String::new()),
            max_connections: Some(0),
            public_host: Some("  ".into()),
            ..Settings::default()
        });
        assert_eq!(config.listen_host, "0.0.0.0");
        assert_eq!(config.max_connections, 10_000);
        assert_eq!(config.public_host, None);
    }

    #[test]
    fn supplied_values_are_kept() {
        let config = ServerConfig::from_settings(Settings {
            listen_host: Some("127.0.0.1".into()),
            listen_port: Some(0),
            public_host: Some("203.0.113.9".into()),
            max_connections: Some(5),
            idle_timeout_secs: Some(300),
            data_connection_timeout_secs: Some(5),
        });
        assert_eq!(config.control_socket(), "127.0.0.1:0");
        assert_eq!(config.public_host, Some("203.0.113.9".parse().unwrap()));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(300)));
        assert_eq!(config.data_connection_timeout, Duration::from_secs(5));
    }

    #[test]
    fn hostname_public_host_is_ignored() {
        let config = ServerConfig::from_settings(Settings {
            public_host: Some("ftp.example.com".into()),
            ..Settings::default()
        });
        assert_eq!(config.public_host, None);
    }

    #[test]
    fn ipv6_listen_host_is_bracketed() {
        let config = ServerConfig::from_settings(Settings {
            listen_host: Some("::1".into()),
            listen_port: Some(21),
            ..Settings::default()
        });
        assert_eq!(config.control_socket(), "[::1]:21");
    }
}
