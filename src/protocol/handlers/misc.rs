//! Connection and informational commands: `TYPE`, `PASV`, `EPSV`, `QUIT`,
//! `FEAT`, `SYST`, `NOOP`, `OPTS`.

use log::{debug, info};
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

use crate::client::Session;
use crate::protocol::commands::HandlerFuture;
use crate::transfer::{PassiveMode, passive_reply, setup_passive_mode};

const FEATURES: [&str; 10] = [
    "211-These are my features",
    " UTF8",
    " SIZE",
    " MDTM",
    " REST STREAM",
    " EPSV",
    " AUTH TLS",
    " PBSZ",
    " PROT",
    "211 End",
];

/// Handles the TYPE command. Every transfer is binary.
pub fn handle_cmd_type(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move { session.reply(200, "Type set to binary").await })
}

/// Handles PASV and EPSV
///
/// Replaces any previously declared channel with a fresh passive listener
/// on an ephemeral port, protected by TLS when `PROT P` is in effect.
pub fn handle_cmd_pasv(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let mode = PassiveMode::from_verb(session.command());
        let server = Arc::clone(session.server());
        // The previous channel goes even when the new one cannot be set up.
        session.discard_transfer();

        let acceptor = if session.transfer_tls() {
            match server.driver.tls_config().await {
                Ok(config) => Some(TlsAcceptor::from(config)),
                Err(e) => {
                    return session
                        .reply(425, &format!("Cannot get a TLS config: {}", e))
                        .await;
                }
            }
        } else {
            None
        };

        let channel = match setup_passive_mode(
            &server.config.listen_host,
            server.config.data_connection_timeout,
            acceptor,
        )
        .await
        {
            Ok(channel) => channel,
            Err(e) => {
                return session
                    .reply(425, &format!("Can't open passive listener: {}", e))
                    .await;
            }
        };

        let announced = server
            .config
            .public_host
            .unwrap_or_else(|| session.control_local_addr().ip());
        let Some((code, message)) = passive_reply(mode, announced, channel.port()) else {
            return session
                .reply(425, "Cannot announce an IPv6 address with PASV, use EPSV")
                .await;
        };

        debug!(
            "Client {} passive channel on port {} (tls: {})",
            session.id(),
            channel.port(),
            channel.is_secure()
        );
        session.set_transfer(Box::new(channel));
        session.reply(code, &message).await
    })
}

/// Handles the QUIT command
pub fn handle_cmd_quit(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        info!("Client {} requested to quit", session.id());
        session.reply(221, "Goodbye").await?;
        session.close();
        Ok(())
    })
}

/// Handles the FEAT command
pub fn handle_cmd_feat(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move { session.reply_lines(&FEATURES).await })
}

/// Handles the SYST command
pub fn handle_cmd_syst(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move { session.reply(215, "UNIX Type: L8").await })
}

/// Handles the NOOP command
pub fn handle_cmd_noop(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move { session.reply(200, "OK").await })
}

/// Handles the OPTS command; only `UTF8` is understood
pub fn handle_cmd_opts(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let option = session
            .param()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        if option == "UTF8" {
            session.reply(200, "I'm in UTF8 only anyway").await
        } else {
            session.reply(500, "Don't know this option").await
        }
    })
}
