//! Directory commands: `CWD`, `PWD`, `CDUP`, `LIST`, `NLST`, `MKD`, `RMD`.

use log::{debug, info};
use tokio::io::AsyncWriteExt;

use crate::client::Session;
use crate::error::SessionError;
use crate::protocol::commands::HandlerFuture;
use crate::protocol::handlers::require_driver;
use crate::protocol::path::parent_path;

/// Handles the PWD command
pub fn handle_cmd_pwd(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let message = format!("\"{}\" is the current directory", session.path());
        session.reply(257, &message).await
    })
}

/// Handles the CWD command
pub fn handle_cmd_cwd(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = session.abs_path(session.param());
        change_directory(session, path).await
    })
}

/// Handles the CDUP command
pub fn handle_cmd_cdup(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let path = parent_path(session.path());
        change_directory(session, path).await
    })
}

async fn change_directory(session: &mut Session, path: String) -> Result<(), SessionError> {
    let Some(driver) = require_driver(session).await? else {
        return Ok(());
    };
    let cc = session.context();
    match driver.change_directory(&cc, &path).await {
        Ok(()) => {
            let message = format!("CD worked on {}", path);
            session.set_path(path);
            session.reply(250, &message).await
        }
        Err(e) => session.reply(550, &format!("CD issue: {}", e)).await,
    }
}

/// Handles the MKD command
pub fn handle_cmd_mkd(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let Some(driver) = require_driver(session).await? else {
            return Ok(());
        };
        let path = session.abs_path(session.param());
        let cc = session.context();
        match driver.make_directory(&cc, &path).await {
            Ok(()) => {
                info!("Client {} created directory {}", session.id(), path);
                session.reply(257, &format!("Created dir {}", path)).await
            }
            Err(e) => {
                session
                    .reply(550, &format!("Couldn't create dir {}: {}", path, e))
                    .await
            }
        }
    })
}

/// Handles the RMD command
pub fn handle_cmd_rmd(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let Some(driver) = require_driver(session).await? else {
            return Ok(());
        };
        let path = session.abs_path(session.param());
        let cc = session.context();
        match driver.delete_file(&cc, &path).await {
            Ok(()) => {
                info!("Client {} removed directory {}", session.id(), path);
                session.reply(250, &format!("Deleted dir {}", path)).await
            }
            Err(e) => {
                session
                    .reply(550, &format!("Couldn't delete dir {}: {}", path, e))
                    .await
            }
        }
    })
}

/// Handles LIST and NLST. Option-like arguments (`-la`) are ignored.
pub fn handle_cmd_list(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let Some(driver) = require_driver(session).await? else {
            return Ok(());
        };
        let names_only = session.command() == "NLST";
        let param = session.param();
        let cc = if param.is_empty() || param.starts_with('-') {
            session.context()
        } else {
            let path = session.abs_path(param);
            session.context().with_path(path)
        };

        let files = match driver.list_files(&cc).await {
            Ok(files) => files,
            Err(e) => {
                return session
                    .reply(550, &format!("Could not list directory: {}", e))
                    .await;
            }
        };

        let listing: String = files
            .iter()
            .map(|file| {
                if names_only {
                    format!("{}\r\n", file.name)
                } else {
                    format!("{}\r\n", file.list_line())
                }
            })
            .collect();

        let mut data = match session.transfer_open().await {
            Ok(data) => data,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!("Client {} listing aborted: {}", session.id(), e);
                return Ok(());
            }
        };
        let sent = async {
            data.write_all(listing.as_bytes()).await?;
            data.shutdown().await
        }
        .await;
        if let Err(e) = sent {
            debug!("Client {} listing interrupted: {}", session.id(), e);
        }
        drop(data);
        session.transfer_close().await
    })
}
