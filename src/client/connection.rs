//! Control connection
//!
//! Line reading and reply writing over a plain or TLS stream, with the
//! in-place upgrade used by `AUTH TLS`.

use std::io;
use std::net::SocketAddr;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;

use crate::protocol::format_response;
use crate::transfer::NetStream;

/// Outcome of reading one command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRead {
    Line,
    TooLong,
    Eof,
}

pub struct ControlConnection {
    // `None` only while a TLS upgrade is in flight, or after it failed.
    stream: Option<BufReader<NetStream>>,
    peer: SocketAddr,
    local: SocketAddr,
}

impl ControlConnection {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let peer = stream.peer_addr()?;
        let local = stream.local_addr()?;
        Ok(Self {
            stream: Some(BufReader::new(NetStream::Plain(stream))),
            peer,
            local,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    pub fn is_secure(&self) -> bool {
        self.stream
            .as_ref()
            .is_some_and(|reader| reader.get_ref().is_secure())
    }

    /// Reads one `\n`-terminated line into `line`, keeping at most `limit`
    /// bytes. The rest of an overlong line is consumed and dropped. Bytes
    /// that are not UTF-8 are replaced rather than rejected.
    pub async fn read_line(&mut self, line: &mut String, limit: usize) -> io::Result<LineRead> {
        let reader = self.stream_mut()?;
        let mut raw = Vec::new();
        let mut overlong = false;

        loop {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                if raw.is_empty() && !overlong {
                    return Ok(LineRead::Eof);
                }
                break;
            }
            let (chunk, complete) = match available.iter().position(|&b| b == b'\n') {
                Some(end) => (&available[..=end], true),
                None => (available, false),
            };
            let used = chunk.len();
            if !overlong {
                if raw.len() + used > limit {
                    overlong = true;
                    raw = Vec::new();
                } else {
                    raw.extend_from_slice(chunk);
                }
            }
            reader.consume(used);
            if complete {
                break;
            }
        }

        if overlong {
            return Ok(LineRead::TooLong);
        }
        line.push_str(&String::from_utf8_lossy(&raw));
        Ok(LineRead::Line)
    }

    /// Writes one reply line and flushes it.
    pub async fn reply(&mut self, code: u16, message: &str) -> io::Result<()> {
        self.write_line(&format_response(code, message)).await
    }

    /// Writes `line` followed by CRLF and flushes.
    pub async fn write_line(&mut self, line: &str) -> io::Result<()> {
        debug!("FTP SEND: {}", line);
        let stream = self.stream_mut()?.get_mut();
        stream.write_all(format!("{}\r\n", line).as_bytes()).await?;
        stream.flush().await
    }

    /// Replaces the plain stream with a TLS stream negotiated on the same
    /// socket. On failure the connection is left unusable.
    pub async fn upgrade(&mut self, acceptor: &TlsAcceptor) -> io::Result<()> {
        let reader = self.stream.take().ok_or_else(lost_connection)?;
        if !reader.buffer().is_empty() {
            warn!(
                "Discarding {} bytes received from {} before TLS negotiation",
                reader.buffer().len(),
                self.peer
            );
        }
        let secured = reader.into_inner().into_tls(acceptor).await?;
        self.stream = Some(BufReader::new(secured));
        Ok(())
    }

    pub async fn shutdown(&mut self) {
        if let Some(reader) = self.stream.as_mut() {
            if let Err(e) = reader.get_mut().shutdown().await {
                debug!("Control connection shutdown for {}: {}", self.peer, e);
            }
        }
    }

    fn stream_mut(&mut self) -> io::Result<&mut BufReader<NetStream>> {
        self.stream.as_mut().ok_or_else(lost_connection)
    }
}

fn lost_connection() -> io::Error {
    io::Error::new(
        io::ErrorKind::NotConnected,
        "control connection lost during TLS negotiation",
    )
}
