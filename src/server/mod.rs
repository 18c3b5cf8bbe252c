//! Server core functionality
//!
//! Listener ownership, admission control and coordinated shutdown.

pub mod config;
pub mod core;
pub mod registry;

pub(crate) use self::core::ServerShared;
pub use self::core::{Server, ServerState};
pub use config::ServerConfig;
pub use registry::{SessionEntry, SessionInfo, SessionRegistry};
