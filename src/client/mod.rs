//! Client session module
//!
//! One session per accepted control connection: the line-oriented control
//! connection, the per-session state and the command loop driving it.

pub mod connection;
pub mod handler;
pub mod session;

pub use connection::{ControlConnection, LineRead};
pub use session::{ContextView, Session, SessionState};
