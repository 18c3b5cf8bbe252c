//! File commands: transfers, metadata, deletion, rename, allocation and
//! restart offsets.

use log::{debug, info, warn};
use std::io::SeekFrom;
use tokio::io::{self, AsyncSeekExt, AsyncWriteExt};

use crate::client::Session;
use crate::driver::OpenMode;
use crate::error::SessionError;
use crate::protocol::commands::HandlerFuture;
use crate::protocol::handlers::require_driver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Retrieve,
    Store,
    Append,
}

/// Handles the RETR command
pub fn handle_cmd_retr(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(transfer_file(session, Direction::Retrieve))
}

/// Handles the STOR command
pub fn handle_cmd_stor(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(transfer_file(session, Direction::Store))
}

/// Handles the APPE command
pub fn handle_cmd_appe(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(transfer_file(session, Direction::Append))
}

async fn transfer_file(session: &mut Session, direction: Direction) -> Result<(), SessionError> {
    // The offset only ever applies to the next transfer command.
    let offset = session.take_restart_offset();
    let Some(driver) = require_driver(session).await? else {
        return Ok(());
    };
    if session.param().is_empty() {
        return session.reply(501, "Missing file name").await;
    }

    let path = session.abs_path(session.param());
    let cc = session.context();
    let mode = match direction {
        Direction::Retrieve => OpenMode::Read,
        Direction::Store if offset > 0 => OpenMode::Resume,
        Direction::Store => OpenMode::Write,
        Direction::Append => OpenMode::Append,
    };

    let mut file = match driver.open_file(&cc, &path, mode).await {
        Ok(file) => file,
        Err(e) => {
            return session
                .reply(550, &format!("Could not access file: {}", e))
                .await;
        }
    };
    if offset > 0 && direction != Direction::Append {
        if let Err(e) = file.seek(SeekFrom::Start(offset)).await {
            return session
                .reply(550, &format!("Could not seek to {}: {}", offset, e))
                .await;
        }
    }

    let mut data = match session.transfer_open().await {
        Ok(data) => data,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            debug!("Client {} transfer of {} aborted: {}", session.id(), path, e);
            return Ok(());
        }
    };

    let copied = match direction {
        Direction::Retrieve => {
            async {
                let n = io::copy(&mut file, &mut data).await?;
                data.shutdown().await?;
                Ok::<_, std::io::Error>(n)
            }
            .await
        }
        Direction::Store | Direction::Append => {
            async {
                let n = io::copy(&mut data, &mut file).await?;
                file.flush().await?;
                Ok::<_, std::io::Error>(n)
            }
            .await
        }
    };
    drop(data);
    drop(file);

    match &copied {
        Ok(bytes) => info!(
            "Client {} {} {} ({} bytes from offset {})",
            session.id(),
            session.command(),
            path,
            bytes,
            offset
        ),
        Err(e) => warn!(
            "Client {} {} {} interrupted: {}",
            session.id(),
            session.command(),
            path,
            e
        ),
    }
    session.transfer_close().await?;

    if copied.is_ok() && direction != Direction::Retrieve {
        if let Err(e) = driver.notify_write(&cc, &path).await {
            warn!("Write notification for {} failed: {}", path, e);
        }
    }
    Ok(())
}

/// Handles the SIZE command
pub fn handle_cmd_size(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let Some(driver) = require_driver(session).await? else {
            return Ok(());
        };
        let path = session.abs_path(session.param());
        let cc = session.context();
        match driver.file_info(&cc, &path).await {
            Ok(info) => session.reply(213, &info.size.to_string()).await,
            Err(e) => {
                session
                    .reply(550, &format!("Couldn't access {}: {}", path, e))
                    .await
            }
        }
    })
}

/// Handles the MDTM command
pub fn handle_cmd_mdtm(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let Some(driver) = require_driver(session).await? else {
            return Ok(());
        };
        let path = session.abs_path(session.param());
        let cc = session.context();
        match driver.file_info(&cc, &path).await {
            Ok(info) => {
                let stamp = info.modified.format("%Y%m%d%H%M%S").to_string();
                session.reply(213, &stamp).await
            }
            Err(e) => {
                session
                    .reply(550, &format!("Couldn't access {}: {}", path, e))
                    .await
            }
        }
    })
}

/// Handles the DELE command
pub fn handle_cmd_dele(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let Some(driver) = require_driver(session).await? else {
            return Ok(());
        };
        let path = session.abs_path(session.param());
        let cc = session.context();
        match driver.delete_file(&cc, &path).await {
            Ok(()) => {
                info!("Client {} removed file {}", session.id(), path);
                session.reply(250, &format!("Removed file {}", path)).await
            }
            Err(e) => {
                session
                    .reply(550, &format!("Couldn't delete {}: {}", path, e))
                    .await
            }
        }
    })
}

/// Handles the RNFR command
pub fn handle_cmd_rnfr(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let from = session.abs_path(session.param());
        session.set_rename_from(from);
        session.reply(350, "Sure, give me a target").await
    })
}

/// Handles the RNTO command
pub fn handle_cmd_rnto(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let Some(from) = session.take_rename_from() else {
            return session
                .reply(503, "Bad sequence of commands: RNFR required first")
                .await;
        };
        let Some(driver) = require_driver(session).await? else {
            return Ok(());
        };
        let to = session.abs_path(session.param());
        let cc = session.context();
        match driver.rename_file(&cc, &from, &to).await {
            Ok(()) => {
                info!("Client {} renamed {} to {}", session.id(), from, to);
                session.reply(250, "Done !").await
            }
            Err(e) => {
                session
                    .reply(550, &format!("Couldn't rename: {}", e))
                    .await
            }
        }
    })
}

/// Handles the ALLO command
pub fn handle_cmd_allo(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        let Some(driver) = require_driver(session).await? else {
            return Ok(());
        };
        // "ALLO <size> [R <record size>]"
        let size = session
            .param()
            .split_whitespace()
            .next()
            .and_then(|size| size.parse::<u64>().ok());
        let Some(size) = size else {
            return session.reply(501, "Couldn't parse size").await;
        };

        let cc = session.context();
        match driver.can_allocate(&cc, size).await {
            Ok(true) => session.reply(202, "OK, we have the free space").await,
            Ok(false) => {
                session
                    .reply(550, "NOT OK, we don't have the free space")
                    .await
            }
            Err(e) => {
                session
                    .reply(550, &format!("Couldn't check allocation: {}", e))
                    .await
            }
        }
    })
}

/// Handles the REST command
pub fn handle_cmd_rest(session: &mut Session) -> HandlerFuture<'_> {
    Box::pin(async move {
        match session.param().parse::<u64>() {
            Ok(offset) => {
                session.set_restart_offset(offset);
                session
                    .reply(350, &format!("Restarting at {}", offset))
                    .await
            }
            Err(_) => session.reply(501, "Couldn't parse offset").await,
        }
    })
}
