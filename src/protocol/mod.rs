//! FTP Protocol implementation
//!
//! Handles command line parsing, reply formatting, virtual path resolution
//! and the command table dispatching verbs to their handlers.

pub mod commands;
pub mod handlers;
pub mod path;
pub mod responses;

pub use commands::{CommandTable, is_auth_command, parse_line};
pub use responses::format_response;
