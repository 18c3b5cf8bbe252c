//! Logging utilities
//!
//! `env_logger` setup for the binary. The engine itself only uses the `log`
//! facade.

use env_logger::{Builder, Env};
use std::io::Write;

/// Initializes logging with an `info` default, overridable through
/// `RUST_LOG` (`RUST_LOG=ftpd_core=debug` shows every command and reply).
pub fn init() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] [{}] {}",
                buf.timestamp(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
