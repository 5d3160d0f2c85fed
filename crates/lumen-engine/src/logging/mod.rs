//! Logger initialization for binaries and tools built on the engine.
//!
//! Library code only uses the `log` facade; `env_logger` is wired up here.

mod init;

pub use init::{init_logging, LoggingConfig};
