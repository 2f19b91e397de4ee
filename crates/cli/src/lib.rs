//! Support code for the `dw` command
//!
//! Kept in a library so the config and logging setup can be tested
//! without running the binary.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, LogConfig, WatchConfig};
