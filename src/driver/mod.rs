//! Driver boundary
//!
//! The engine never authenticates anyone or touches storage itself. It hands
//! those jobs to the traits below, implemented by whoever embeds the server.

pub mod file_info;
pub mod settings;

pub use file_info::{FileInfo, OpenMode};
pub use settings::Settings;

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite};

use crate::error::DriverError;

/// Read-only view of a session handed to drivers.
pub trait ClientContext: Send + Sync {
    /// Session id assigned by the server.
    fn id(&self) -> u64;

    /// Address of the control connection peer.
    fn remote_addr(&self) -> SocketAddr;

    /// Current working path of the session.
    fn path(&self) -> &str;

    /// Authenticated user, or the candidate user before `PASS` succeeds.
    fn user(&self) -> &str;
}

/// Handles authentication and selects the filesystem driver of a session.
#[async_trait]
pub trait ServerDriver: Send + Sync {
    /// General settings; absent fields fall back to the engine defaults.
    fn settings(&self) -> Settings;

    /// Produces the greeting sent with `220`. An error rejects the
    /// connection.
    async fn welcome_user(&self, cc: &dyn ClientContext) -> Result<String, DriverError>;

    /// Called once on every disconnect of an admitted session.
    async fn user_left(&self, cc: &dyn ClientContext);

    /// Authenticates `user` and returns the driver serving its files.
    async fn auth_user(
        &self,
        cc: &dyn ClientContext,
        user: &str,
        pass: &str,
    ) -> Result<Arc<dyn ClientHandlingDriver>, DriverError>;

    /// TLS configuration for `AUTH` and protected transfers. Called on every
    /// use so certificates can rotate.
    async fn tls_config(&self) -> Result<Arc<rustls::ServerConfig>, DriverError>;
}

/// Filesystem access for one authenticated session.
///
/// All paths are absolute, normalized virtual paths (`/docs/a.txt`).
#[async_trait]
pub trait ClientHandlingDriver: Send + Sync {
    async fn change_directory(
        &self,
        cc: &dyn ClientContext,
        directory: &str,
    ) -> Result<(), DriverError>;

    async fn make_directory(
        &self,
        cc: &dyn ClientContext,
        directory: &str,
    ) -> Result<(), DriverError>;

    /// Lists the entries of `cc.path()`.
    async fn list_files(&self, cc: &dyn ClientContext) -> Result<Vec<FileInfo>, DriverError>;

    async fn open_file(
        &self,
        cc: &dyn ClientContext,
        path: &str,
        mode: OpenMode,
    ) -> Result<Box<dyn FileStream>, DriverError>;

    /// Deletes a file or a directory.
    async fn delete_file(&self, cc: &dyn ClientContext, path: &str) -> Result<(), DriverError>;

    async fn file_info(&self, cc: &dyn ClientContext, path: &str) -> Result<FileInfo, DriverError>;

    async fn rename_file(
        &self,
        cc: &dyn ClientContext,
        from: &str,
        to: &str,
    ) -> Result<(), DriverError>;

    /// Approves (or not) the allocation of `size` bytes.
    async fn can_allocate(&self, cc: &dyn ClientContext, size: u64) -> Result<bool, DriverError>;

    /// Called after a file was written through `STOR` or `APPE`.
    async fn notify_write(&self, cc: &dyn ClientContext, path: &str) -> Result<(), DriverError>;
}

/// A readable, writable, seekable file handle.
pub trait FileStream: AsyncRead + AsyncWrite + AsyncSeek + Unpin + Send {}

impl<T> FileStream for T where T: AsyncRead + AsyncWrite + AsyncSeek + Unpin + Send {}
