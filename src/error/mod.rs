//! Error handling
//!
//! Defines the error types shared by the server, sessions, transfer channels
//! and drivers.

pub mod types;

pub use types::*;
