//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, TTLs, defaults)
//! - Library configuration structs for the server and the poller
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{
    Cli, Command, Credentials, LogFormat, LogLevel, ServeArgs, ServerConfig, WatchArgs,
    WatchConfig,
};
