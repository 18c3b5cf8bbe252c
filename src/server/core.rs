use chrono::{DateTime, Utc};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};

use crate::client::handler::handle_client;
use crate::driver::ServerDriver;
use crate::error::ServerError;
use crate::protocol::CommandTable;
use crate::server::config::ServerConfig;
use crate::server::registry::{SessionInfo, SessionRegistry};

/// Lifecycle of a server, published to the accept loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Running,
    Draining,
    Closed,
}

/// State shared by the server handle and every session task.
pub(crate) struct ServerShared {
    pub(crate) driver: Arc<dyn ServerDriver>,
    pub(crate) config: ServerConfig,
    pub(crate) registry: SessionRegistry,
    pub(crate) commands: CommandTable,
    start_time: DateTime<Utc>,
    next_id: AtomicU64,
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    state: watch::Sender<ServerState>,
}

impl ServerShared {
    pub(crate) fn new(
        driver: Arc<dyn ServerDriver>,
        config: ServerConfig,
        listener: Option<TcpListener>,
        local_addr: SocketAddr,
    ) -> Self {
        let (state, _) = watch::channel(ServerState::Running);
        Self {
            driver,
            registry: SessionRegistry::new(config.max_connections),
            config,
            commands: CommandTable::new(),
            start_time: Utc::now(),
            next_id: AtomicU64::new(1),
            listener: Mutex::new(listener),
            local_addr,
            state,
        }
    }
}

/// Handle on a running FTP server. Clones share the same server.
#[derive(Clone)]
pub struct Server {
    shared: Arc<ServerShared>,
}

impl Server {
    /// Resolves the driver settings and binds the control listener.
    pub async fn bind(driver: Arc<dyn ServerDriver>) -> Result<Self, ServerError> {
        let config = ServerConfig::from_settings(driver.settings());
        let addr = config.control_socket();

        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(source) => {
                error!("Failed to bind to {}: {}", addr, source);
                return Err(ServerError::Bind { addr, source });
            }
        };
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("Server bound to {}", local_addr);

        Ok(Self {
            shared: Arc::new(ServerShared::new(
                driver,
                config,
                Some(listener),
                local_addr,
            )),
        })
    }

    /// Binds and serves until shutdown.
    pub async fn listen_and_serve(driver: Arc<dyn ServerDriver>) -> Result<(), ServerError> {
        Self::bind(driver).await?.serve().await
    }

    /// Accepts connections, one task per session, until `shutdown` begins.
    ///
    /// The listener stays bound while sessions drain and is dropped once
    /// shutdown completes. An accept error stops the server.
    pub async fn serve(&self) -> Result<(), ServerError> {
        let Some(listener) = self.shared.listener.lock().await.take() else {
            // Shut down before serving started.
            if self.state() != ServerState::Running {
                return Ok(());
            }
            return Err(ServerError::AlreadyServing);
        };
        let mut state = self.shared.state.subscribe();

        info!(
            "Starting FTP server on {} (max {} clients)",
            self.shared.local_addr, self.shared.config.max_connections
        );

        while *state.borrow_and_update() == ServerState::Running {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(stream, peer),
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        return Err(ServerError::Accept(e));
                    }
                },
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("No longer accepting connections");
        while *state.borrow_and_update() != ServerState::Closed {
            if state.changed().await.is_err() {
                break;
            }
        }
        drop(listener);
        info!("Listener on {} closed", self.shared.local_addr);
        Ok(())
    }

    /// Stops accepting, waits for every open transfer to finish, then
    /// closes the listener. Sessions themselves are never killed.
    pub async fn shutdown(&self) {
        info!(
            "Shutting down, draining {} session(s)",
            self.shared.registry.len().await
        );
        self.shared.state.send_replace(ServerState::Draining);
        self.shared.registry.drain().await;

        // Not taken when `serve` never ran.
        self.shared.listener.lock().await.take();
        self.shared.state.send_replace(ServerState::Closed);
        info!("Shutdown complete");
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(handle_client(shared, id, stream, peer));
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.shared.local_addr
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.shared.start_time
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    pub fn state(&self) -> ServerState {
        *self.shared.state.borrow()
    }

    pub async fn session_count(&self) -> usize {
        self.shared.registry.len().await
    }

    pub async fn sessions(&self) -> Vec<SessionInfo> {
        self.shared.registry.snapshot().await
    }
}
