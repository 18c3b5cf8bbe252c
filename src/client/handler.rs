use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time;

use crate::client::{ControlConnection, LineRead, Session};
use crate::error::SessionError;
use crate::protocol::responses::{
    COMMAND_LINE_TOO_LONG, NOT_HANDLED, NOT_LOGGED_IN, SERVICE_CLOSING,
};
use crate::protocol::{is_auth_command, parse_line};
use crate::server::ServerShared;

const MAX_COMMAND_LENGTH: usize = 4096;

/// Serves one control connection from admission to disconnect.
///
/// - Registers the session, rejecting it past the connection limit.
/// - Greets through the driver and runs the command loop.
/// - On every exit: `user_left`, transfer cleanup, deregistration.
pub(crate) async fn handle_client(
    server: Arc<ServerShared>,
    id: u64,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let conn = match ControlConnection::new(stream) {
        Ok(conn) => conn,
        Err(e) => {
            warn!("Dropping client {} ({}): {}", id, peer, e);
            return;
        }
    };
    let mut session = Session::new(id, Arc::clone(&server), conn);

    if let Err(e) = server
        .registry
        .register_arrival(id, session.registry_entry())
        .await
    {
        warn!("Rejecting client {} ({}): {}", id, peer, e);
        let _ = session
            .reply(500, &format!("Can't accept you - {}", e))
            .await;
        session.end().await;
        server.registry.register_departure(id).await;
        return;
    }

    if let Err(e) = serve_commands(&server, &mut session).await {
        warn!("Client {} session ended: {}", id, e);
    }

    server.driver.user_left(&session.context()).await;
    session.end().await;
    server.registry.register_departure(id).await;
    info!("Client {} disconnected", id);
}

async fn serve_commands(server: &ServerShared, session: &mut Session) -> Result<(), SessionError> {
    match server.driver.welcome_user(&session.context()).await {
        Ok(message) => session.reply(220, &message).await?,
        Err(e) => {
            session.reply(500, &e.to_string()).await?;
            return Ok(());
        }
    }

    let mut line = String::new();
    while !session.is_closed() {
        line.clear();
        let read = match server.config.idle_timeout {
            Some(limit) => match time::timeout(
                limit,
                session.read_line(&mut line, MAX_COMMAND_LENGTH),
            )
            .await
            {
                Ok(read) => read,
                Err(_) => {
                    info!("Client {} idle for {:?}, closing", session.id(), limit);
                    session
                        .reply(SERVICE_CLOSING, "Idle timeout, closing control connection")
                        .await?;
                    break;
                }
            },
            None => session.read_line(&mut line, MAX_COMMAND_LENGTH).await,
        };

        match read {
            Ok(LineRead::Line) => {}
            Ok(LineRead::TooLong) => {
                session
                    .reply(COMMAND_LINE_TOO_LONG, "Command line too long")
                    .await?;
                continue;
            }
            Ok(LineRead::Eof) => {
                info!("Connection closed by client {}", session.id());
                break;
            }
            Err(e) => {
                debug!("Failed to read from client {}: {}", session.id(), e);
                break;
            }
        }

        let (command, param) = parse_line(&line);
        if command == "PASS" {
            debug!("FTP RECV: PASS ****");
        } else {
            debug!("FTP RECV: {}", line.trim_end());
        }
        session.set_command(command, param);

        match dispatch(server, session).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => debug!("Client {} command failed: {}", session.id(), e),
        }
    }

    session.close();
    Ok(())
}

async fn dispatch(server: &ServerShared, session: &mut Session) -> Result<(), SessionError> {
    let command = session.command().to_string();

    if !session.is_authenticated() && !is_auth_command(&command) {
        return session
            .reply(NOT_LOGGED_IN, "Please login with USER and PASS")
            .await;
    }

    // RNTO has to follow RNFR directly.
    if command != "RNFR" && command != "RNTO" && session.take_rename_from().is_some() {
        debug!("Client {} dropped its pending rename", session.id());
    }

    match server.commands.get(&command) {
        Some(handler) => handler(session).await,
        None => session.reply(NOT_HANDLED, "Not handled").await,
    }
}
