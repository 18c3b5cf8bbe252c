//! FTP Response handling
//!
//! Reply codes used by the command loop itself and reply line formatting.

pub const COMMAND_LINE_TOO_LONG: u16 = 500;
pub const SERVICE_CLOSING: u16 = 421;
pub const NOT_LOGGED_IN: u16 = 530;
pub const NOT_HANDLED: u16 = 550;

/// Formats a single reply line, without line terminator.
pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}", code, message)
}
