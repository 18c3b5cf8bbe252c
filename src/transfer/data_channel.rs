//! Module `data_channel`
//!
//! Defines the transfer channel contract used by sessions and the passive
//! mode implementation: the server listens on an ephemeral port and the
//! client connects to it for exactly one data transfer.

use async_trait::async_trait;
use log::{debug, info};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time;
use tokio_rustls::TlsAcceptor;

use crate::error::TransferError;
use crate::transfer::NetStream;

/// A secondary connection used to move file content.
#[async_trait]
pub trait TransferChannel: Send + Sync {
    /// Establishes the data connection and yields its byte stream.
    async fn open(&mut self) -> Result<NetStream, TransferError>;

    /// Releases the channel. Idempotent; safe on a channel never opened.
    fn close(&mut self);
}

/// Passive mode channel: a listener accepting a single connection.
pub struct PassiveChannel {
    listener: Option<TcpListener>,
    acceptor: Option<TlsAcceptor>,
    accept_timeout: Duration,
    port: u16,
}

impl PassiveChannel {
    /// Binds an ephemeral port on `host`. When `acceptor` is set the
    /// accepted connection is secured before it is handed out.
    pub async fn bind(
        host: &str,
        accept_timeout: Duration,
        acceptor: Option<TlsAcceptor>,
    ) -> Result<Self, TransferError> {
        let listener = TcpListener::bind((host, 0))
            .await
            .map_err(TransferError::Bind)?;
        let port = listener.local_addr().map_err(TransferError::Bind)?.port();

        debug!(
            "Passive listener bound on {}:{} (tls: {})",
            host,
            port,
            acceptor.is_some()
        );

        Ok(Self {
            listener: Some(listener),
            acceptor,
            accept_timeout,
            port,
        })
    }

    /// Port the client must connect to.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.acceptor.is_some()
    }
}

#[async_trait]
impl TransferChannel for PassiveChannel {
    async fn open(&mut self) -> Result<NetStream, TransferError> {
        let listener = self.listener.as_ref().ok_or(TransferError::Closed)?;
        let port = self.port;
        let acceptor = self.acceptor.as_ref();

        // The deadline covers the TLS handshake as well as the accept.
        let connect = async move {
            let (stream, peer) = listener.accept().await.map_err(TransferError::Accept)?;
            info!("Transfer connection accepted from {} on port {}", peer, port);

            let stream = NetStream::Plain(stream);
            match acceptor {
                Some(acceptor) => stream
                    .into_tls(acceptor)
                    .await
                    .map_err(TransferError::Handshake),
                None => Ok(stream),
            }
        };

        time::timeout(self.accept_timeout, connect)
            .await
            .map_err(|_| TransferError::Timeout(self.accept_timeout))?
    }

    fn close(&mut self) {
        if self.listener.take().is_some() {
            debug!("Passive listener on port {} closed", self.port);
        }
    }
}
