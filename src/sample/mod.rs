//! Sample driver
//!
//! A ready-to-run driver used by the `ftpd` binary and the integration
//! tests: users and TLS files come from `config.toml`, files live under a
//! local root directory.

pub mod config;
pub mod driver;
pub mod fs;

pub use config::AppConfig;
pub use driver::SampleDriver;
pub use fs::LocalFs;
