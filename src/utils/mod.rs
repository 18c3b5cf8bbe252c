//! Utility functions
//!
//! Process-level helpers used by the binary.

pub mod logging;
