//! Login and TLS commands: `USER`, `PASS`, `AUTH`, `PBSZ`, `PROT`.

use log::{info, warn};
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

use crate::client::Session;
use crate::protocol::commands::HandlerFuture;

/// Handles the USER command
pub fn handle_cmd_user(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        if session.is_authenticated() {
            return session.reply(530, "Already logged in").await;
        }
        let user = session.param().to_string();
        session.set_user(&user);
        session.reply(331, "OK").await
    })
}

/// Handles the PASS command
pub fn handle_cmd_pass(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        if session.is_authenticated() {
            return session.reply(530, "Already logged in").await;
        }
        if session.user().is_empty() {
            return session.reply(503, "Login with USER first").await;
        }

        let server = Arc::clone(session.server());
        let cc = session.context();
        let user = session.user().to_string();
        let pass = session.param().to_string();
        match server.driver.auth_user(&cc, &user, &pass).await {
            Ok(driver) => {
                info!("Client {} logged in as {}", session.id(), user);
                session.authenticate(driver);
                session.reply(230, "Password ok, continue").await
            }
            Err(e) => {
                warn!("Client {} failed to log in as {}: {}", session.id(), user, e);
                session
                    .reply(530, &format!("Authentication problem: {}", e))
                    .await
            }
        }
    })
}

/// Handles the AUTH command, upgrading the control connection to TLS
pub fn handle_cmd_auth(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        if session.is_control_secure() {
            return session.reply(503, "Already using TLS").await;
        }
        let mechanism = session.param().to_ascii_uppercase();
        if !matches!(mechanism.as_str(), "TLS" | "TLS-C" | "SSL") {
            return session
                .reply(504, &format!("Unsupported security mechanism {}", mechanism))
                .await;
        }

        let server = Arc::clone(session.server());
        match server.driver.tls_config().await {
            Ok(config) => {
                session
                    .reply(234, "AUTH command ok. Expecting TLS Negotiation.")
                    .await?;
                session.upgrade_control(&TlsAcceptor::from(config)).await
            }
            Err(e) => {
                session
                    .reply(550, &format!("Cannot get a TLS config: {}", e))
                    .await
            }
        }
    })
}

/// Handles the PBSZ command
pub fn handle_cmd_pbsz(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        match session.param().parse::<u64>() {
            Ok(size) => {
                session.set_pbsz(size);
                session.reply(200, &format!("PBSZ={}", size)).await
            }
            Err(_) => session.reply(501, "Couldn't parse buffer size").await,
        }
    })
}

/// Handles the PROT command; applies to channels declared afterwards
pub fn handle_cmd_prot(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        match session.param().to_ascii_uppercase().as_str() {
            "P" => {
                session.set_transfer_tls(true);
                session.reply(200, "OK").await
            }
            "C" => {
                session.set_transfer_tls(false);
                session.reply(200, "OK").await
            }
            _ => session.reply(536, "Protection level not supported").await,
        }
    })
}
