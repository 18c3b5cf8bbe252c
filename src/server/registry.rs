//! Session registry
//!
//! Tracks live sessions by id, enforces the connection limit and lets the
//! shutdown sequence wait for open transfers to finish.

use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::{Mutex, watch};

use crate::error::ServerError;

/// What the registry knows about a live session.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    peer: SocketAddr,
    connected_at: DateTime<Utc>,
    transfer_open: watch::Receiver<bool>,
}

impl SessionEntry {
    /// `transfer_open` publishes whether the session holds a transfer
    /// channel; the session keeps the sender.
    pub fn new(
        peer: SocketAddr,
        connected_at: DateTime<Utc>,
        transfer_open: watch::Receiver<bool>,
    ) -> Self {
        Self {
            peer,
            connected_at,
            transfer_open,
        }
    }

    /// True when the session holds no transfer channel, or is gone.
    pub fn is_transfer_closed(&self) -> bool {
        !*self.transfer_open.borrow() || self.transfer_open.has_changed().is_err()
    }
}

/// Point-in-time view of a registered session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: u64,
    pub peer: SocketAddr,
    pub connected_at: DateTime<Utc>,
    pub transfer_open: bool,
}

/// Registry of live sessions, keyed by session id.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<u64, SessionEntry>>,
    max_connections: usize,
}

impl SessionRegistry {
    pub fn new(max_connections: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_connections,
        }
    }

    /// Registers a session. Past the connection limit an error is returned
    /// but the entry stays registered: the caller closes the connection and
    /// its departure removes the entry.
    pub async fn register_arrival(&self, id: u64, entry: SessionEntry) -> Result<(), ServerError> {
        let mut sessions = self.sessions.lock().await;
        let peer = entry.peer;
        sessions.insert(id, entry);
        let count = sessions.len();

        info!("Client {} connected from {} ({} active)", id, peer, count);

        if count > self.max_connections {
            return Err(ServerError::TooManyClients {
                count,
                max: self.max_connections,
            });
        }
        Ok(())
    }

    /// Removes a session. Calling it twice is harmless.
    pub async fn register_departure(&self, id: u64) {
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.remove(&id) {
            info!(
                "Client {} from {} disconnected ({} active)",
                id,
                entry.peer,
                sessions.len()
            );
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.lock().await;
        let mut infos: Vec<SessionInfo> = sessions
            .iter()
            .map(|(id, entry)| SessionInfo {
                id: *id,
                peer: entry.peer,
                connected_at: entry.connected_at,
                transfer_open: !entry.is_transfer_closed(),
            })
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Waits until no registered session holds a transfer channel.
    ///
    /// The lock is only held while scanning. After each wait the registry is
    /// scanned again so sessions that arrived meanwhile are covered.
    pub async fn drain(&self) {
        loop {
            let pending: Vec<(u64, watch::Receiver<bool>)> = {
                let sessions = self.sessions.lock().await;
                sessions
                    .iter()
                    .filter(|(_, entry)| !entry.is_transfer_closed())
                    .map(|(id, entry)| (*id, entry.transfer_open.clone()))
                    .collect()
            };

            if pending.is_empty() {
                return;
            }

            info!("Waiting for {} open transfer(s) to close", pending.len());
            for (id, mut transfer_open) in pending {
                // A dropped sender means the session ended.
                let _ = transfer_open.wait_for(|open| !*open).await;
                debug!("Client {} transfer closed", id);
            }
        }
    }
}
