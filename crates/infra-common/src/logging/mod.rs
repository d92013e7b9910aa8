//! Logging setup for the peerkit stack.

pub mod setup;

pub use setup::{init_logging, parse_log_level, LoggingConfig};
