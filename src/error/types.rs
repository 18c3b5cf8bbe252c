//! Error types
//!
//! Each layer of the engine has its own error enum. Only `ServerError::Bind`
//! and `ServerError::Accept` stop the server; everything else is scoped to a
//! single session.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by driver implementations.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("connection rejected: {0}")]
    Rejected(String),

    #[error("TLS not configured")]
    TlsNotConfigured,

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Transfer (data) channel errors. Never fatal to the session.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("No passive connection declared")]
    NoChannel,

    #[error("failed to bind data listener: {0}")]
    Bind(#[source] io::Error),

    #[error("failed to accept data connection: {0}")]
    Accept(#[source] io::Error),

    #[error("no data connection within {0:?}")]
    Timeout(Duration),

    #[error("data channel TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),

    #[error("transfer channel already closed")]
    Closed,
}

/// Errors raised while running a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Control connection read/write failure.
    #[error("control connection I/O error: {0}")]
    Io(#[from] io::Error),

    /// The in-place TLS upgrade of the control connection failed; the
    /// plain stream is gone at that point.
    #[error("control connection TLS handshake failed: {0}")]
    Handshake(#[source] io::Error),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl SessionError {
    /// Whether the error ends the session's command loop.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::Transfer(_))
    }
}

/// Server-level errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    #[error("Too many clients {count} > {max}")]
    TooManyClients { count: usize, max: usize },

    #[error("server is already serving or was shut down")]
    AlreadyServing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_errors_are_not_fatal() {
        let err = SessionError::from(TransferError::NoChannel);
        assert!(!err.is_fatal());

        let err = SessionError::from(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(err.is_fatal());
    }

    #[test]
    fn admission_message_names_both_counts() {
        let err = ServerError::TooManyClients { count: 3, max: 2 };
        assert_eq!(err.to_string(), "Too many clients 3 > 2");
    }
}
