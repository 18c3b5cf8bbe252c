//! Transfer module for FTP server
//!
//! Handles data channel negotiation: the transfer channel abstraction, the
//! passive-mode implementation and the plain/TLS byte stream shared with the
//! control connection.

pub mod data_channel;
pub mod operations;
pub mod stream;

pub use data_channel::{PassiveChannel, TransferChannel};
pub use operations::{PassiveMode, passive_reply, setup_passive_mode};
pub use stream::NetStream;
