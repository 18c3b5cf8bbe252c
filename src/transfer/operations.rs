//! Transfer operations
//!
//! Passive mode setup and the address announcement sent back to the client.

use std::net::IpAddr;
use std::time::Duration;
use tokio_rustls::TlsAcceptor;

use crate::error::TransferError;
use crate::transfer::PassiveChannel;

/// Flavour of passive command, decides the reply format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassiveMode {
    /// `PASV`: `227` with an IPv4 address and split port.
    Pasv,
    /// `EPSV`: `229` with the port only.
    Epsv,
}

impl PassiveMode {
    pub fn from_verb(verb: &str) -> Self {
        if verb == "EPSV" {
            PassiveMode::Epsv
        } else {
            PassiveMode::Pasv
        }
    }
}

/// Binds a new passive channel on `bind_host`.
pub async fn setup_passive_mode(
    bind_host: &str,
    accept_timeout: Duration,
    acceptor: Option<TlsAcceptor>,
) -> Result<PassiveChannel, TransferError> {
    PassiveChannel::bind(bind_host, accept_timeout, acceptor).await
}

/// Builds the reply announcing a passive endpoint. `None` when the mode
/// cannot describe the address (`PASV` only speaks IPv4).
pub fn passive_reply(mode: PassiveMode, host: IpAddr, port: u16) -> Option<(u16, String)> {
    match mode {
        PassiveMode::Epsv => Some((
            229,
            format!("Entering Extended Passive Mode (|||{}|)", port),
        )),
        PassiveMode::Pasv => {
            let v4 = match host {
                IpAddr::V4(v4) => v4,
                IpAddr::V6(v6) => v6.to_ipv4_mapped()?,
            };
            let [a, b, c, d] = v4.octets();
            Some((
                227,
                format!(
                    "Entering Passive Mode ({},{},{},{},{},{})",
                    a,
                    b,
                    c,
                    d,
                    port / 256,
                    port % 256
                ),
            ))
        }
    }
}
