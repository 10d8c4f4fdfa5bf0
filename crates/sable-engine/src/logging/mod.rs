//! Logging utilities.
//!
//! Everything in the crate logs through the `log` facade; this module only
//! installs an `env_logger` backend for binaries that want one.

mod init;

pub use init::{DEFAULT_FILTER, LoggingConfig, init_logging};
