//! Per-session state
//!
//! A `Session` is owned by the task serving its control connection. The
//! registry only observes it through the transfer-state watch channel.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;

use crate::client::{ControlConnection, LineRead};
use crate::driver::{ClientContext, ClientHandlingDriver};
use crate::error::{SessionError, TransferError};
use crate::protocol::path::resolve_path;
use crate::server::ServerShared;
use crate::server::registry::SessionEntry;
use crate::transfer::{NetStream, TransferChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Authenticated,
    Closed,
}

/// Snapshot of a session handed to drivers.
#[derive(Debug, Clone)]
pub struct ContextView {
    id: u64,
    remote_addr: SocketAddr,
    path: String,
    user: String,
}

impl ContextView {
    pub fn new(id: u64, remote_addr: SocketAddr, path: &str, user: &str) -> Self {
        Self {
            id,
            remote_addr,
            path: path.to_string(),
            user: user.to_string(),
        }
    }

    /// Same view with another current path, used to list a directory other
    /// than the working one.
    pub fn with_path(mut self, path: String) -> Self {
        self.path = path;
        self
    }
}

impl ClientContext for ContextView {
    fn id(&self) -> u64 {
        self.id
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn user(&self) -> &str {
        &self.user
    }
}

pub struct Session {
    id: u64,
    server: Arc<ServerShared>,
    conn: ControlConnection,
    state: SessionState,
    user: String,
    driver: Option<Arc<dyn ClientHandlingDriver>>,
    path: String,
    command: String,
    param: String,
    connected_at: DateTime<Utc>,
    rename_from: Option<String>,
    restart_offset: u64,
    transfer: Option<Box<dyn TransferChannel>>,
    transfer_tls: bool,
    pbsz: Option<u64>,
    transfer_state: watch::Sender<bool>,
}

impl Session {
    pub(crate) fn new(id: u64, server: Arc<ServerShared>, conn: ControlConnection) -> Self {
        let (transfer_state, _) = watch::channel(false);
        Self {
            id,
            server,
            conn,
            state: SessionState::Connected,
            user: String::new(),
            driver: None,
            path: "/".to_string(),
            command: String::new(),
            param: String::new(),
            connected_at: Utc::now(),
            rename_from: None,
            restart_offset: 0,
            transfer: None,
            transfer_tls: false,
            pbsz: None,
            transfer_state,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn server(&self) -> &Arc<ServerShared> {
        &self.server
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.conn.peer_addr()
    }

    pub fn control_local_addr(&self) -> SocketAddr {
        self.conn.local_addr()
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Registry entry observing this session's transfer state.
    pub fn registry_entry(&self) -> SessionEntry {
        SessionEntry::new(
            self.peer_addr(),
            self.connected_at,
            self.transfer_state.subscribe(),
        )
    }

    pub fn context(&self) -> ContextView {
        ContextView::new(self.id, self.peer_addr(), &self.path, &self.user)
    }

    // State

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Stores the filesystem driver returned by a successful login.
    pub fn authenticate(&mut self, driver: Arc<dyn ClientHandlingDriver>) {
        self.driver = Some(driver);
        self.state = SessionState::Authenticated;
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    pub fn fs_driver(&self) -> Option<Arc<dyn ClientHandlingDriver>> {
        self.driver.clone()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn set_user(&mut self, user: &str) {
        self.user = user.to_string();
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: String) {
        self.path = path;
    }

    /// Absolute virtual path of `param` relative to the working path.
    pub fn abs_path(&self, param: &str) -> String {
        resolve_path(&self.path, param)
    }

    // Current command

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    pub fn set_command(&mut self, command: String, param: String) {
        self.command = command;
        self.param = param;
    }

    // Multi-command sequences

    pub fn rename_from(&self) -> Option<&str> {
        self.rename_from.as_deref()
    }

    pub fn set_rename_from(&mut self, path: String) {
        self.rename_from = Some(path);
    }

    pub fn take_rename_from(&mut self) -> Option<String> {
        self.rename_from.take()
    }

    pub fn restart_offset(&self) -> u64 {
        self.restart_offset
    }

    pub fn set_restart_offset(&mut self, offset: u64) {
        self.restart_offset = offset;
    }

    /// Returns the pending offset and resets it.
    pub fn take_restart_offset(&mut self) -> u64 {
        std::mem::take(&mut self.restart_offset)
    }

    // TLS

    pub fn is_control_secure(&self) -> bool {
        self.conn.is_secure()
    }

    pub fn transfer_tls(&self) -> bool {
        self.transfer_tls
    }

    pub fn set_transfer_tls(&mut self, enabled: bool) {
        self.transfer_tls = enabled;
    }

    pub fn pbsz(&self) -> Option<u64> {
        self.pbsz
    }

    pub fn set_pbsz(&mut self, size: u64) {
        self.pbsz = Some(size);
    }

    /// Upgrades the control connection in place. Failure is fatal.
    pub async fn upgrade_control(&mut self, acceptor: &TlsAcceptor) -> Result<(), SessionError> {
        self.conn
            .upgrade(acceptor)
            .await
            .map_err(SessionError::Handshake)?;
        info!("Client {} control connection secured", self.id);
        Ok(())
    }

    // Control I/O

    pub async fn reply(&mut self, code: u16, message: &str) -> Result<(), SessionError> {
        self.conn.reply(code, message).await?;
        Ok(())
    }

    /// Writes a multi-line reply; each entry is one full line.
    pub async fn reply_lines(&mut self, lines: &[&str]) -> Result<(), SessionError> {
        for line in lines {
            self.conn.write_line(line).await?;
        }
        Ok(())
    }

    pub(crate) async fn read_line(
        &mut self,
        line: &mut String,
        limit: usize,
    ) -> std::io::Result<LineRead> {
        self.conn.read_line(line, limit).await
    }

    // Transfer channel

    /// Installs a new transfer channel, silently closing any previous one.
    pub fn set_transfer(&mut self, channel: Box<dyn TransferChannel>) {
        if let Some(mut previous) = self.transfer.replace(channel) {
            debug!("Client {} replaced its transfer channel", self.id);
            previous.close();
        }
        self.transfer_state.send_replace(true);
    }

    pub fn is_transfer_closed(&self) -> bool {
        self.transfer.is_none()
    }

    /// Opens the data stream of the declared transfer channel.
    pub async fn transfer_open(&mut self) -> Result<NetStream, SessionError> {
        if self.transfer.is_none() {
            self.reply(550, &TransferError::NoChannel.to_string()).await?;
            return Err(TransferError::NoChannel.into());
        }

        self.reply(150, "Using transfer connection").await?;
        let opened = match self.transfer.as_mut() {
            Some(channel) => channel.open().await,
            None => Err(TransferError::NoChannel),
        };
        match opened {
            Ok(stream) => {
                debug!("Client {} transfer connection opened", self.id);
                Ok(stream)
            }
            Err(e) => {
                // A channel that failed to open is not reusable.
                self.discard_transfer();
                self.reply(425, &format!("Can't open data connection: {}", e))
                    .await?;
                Err(e.into())
            }
        }
    }

    /// Drops the transfer channel, if any, without a reply.
    pub fn discard_transfer(&mut self) {
        if let Some(mut channel) = self.transfer.take() {
            channel.close();
        }
        self.transfer_state.send_replace(false);
    }

    /// Closes the transfer channel, if any, and announces it with `226`.
    pub async fn transfer_close(&mut self) -> Result<(), SessionError> {
        let Some(mut channel) = self.transfer.take() else {
            return Ok(());
        };
        channel.close();
        self.transfer_state.send_replace(false);
        debug!("Client {} transfer connection closed", self.id);
        self.reply(226, "Closing transfer connection").await
    }

    /// Releases everything the session holds. Used on every exit path.
    pub(crate) async fn end(&mut self) {
        self.discard_transfer();
        self.state = SessionState::Closed;
        self.conn.shutdown().await;
    }
}
