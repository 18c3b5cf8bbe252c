//! Driver-supplied server settings.

use serde::Deserialize;

/// Settings provided by `ServerDriver::settings`. Every field is optional;
/// see `ServerConfig::from_settings` for the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Host to receive connections on.
    pub listen_host: Option<String>,

    /// Port to listen on. `Some(0)` asks the OS for an ephemeral port.
    pub listen_port: Option<u16>,

    /// Address advertised in `PASV` replies.
    pub public_host: Option<String>,

    /// Max number of concurrent sessions.
    pub max_connections: Option<usize>,

    /// Closes idle control connections when set.
    pub idle_timeout_secs: Option<u64>,

    /// How long a passive listener waits for the client.
    pub data_connection_timeout_secs: Option<u64>,
}
