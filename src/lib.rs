//! ftpd-core
//!
//! Protocol engine of an embeddable FTP server. Authentication and storage
//! are supplied by the embedder through the traits in [`driver`]; the
//! [`sample`] module ships a config-driven driver over a local directory.

pub mod client;
pub mod driver;
pub mod error;
pub mod protocol;
pub mod sample;
pub mod server;
pub mod transfer;
pub mod utils;

pub use driver::{ClientContext, ClientHandlingDriver, FileInfo, OpenMode, ServerDriver, Settings};
pub use error::{DriverError, ServerError, SessionError, TransferError};
pub use server::Server;
