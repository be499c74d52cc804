//! Application initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - Logger
//! - HTTP clients (with timeouts)
//! - Concurrency limiters
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

use std::sync::Arc;

use tokio::sync::Semaphore;

// Re-export public API
pub use client::{init_api_client, init_geo_client};
pub use logger::init_logger_with;

/// Initializes a semaphore for controlling concurrency.
///
/// Used to bound how many harvest commands may run at once.
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_init_semaphore_permits() {
        let semaphore = init_semaphore(2);
        assert_eq!(semaphore.available_permits(), 2);
    }

    #[test]
    fn test_init_clients() {
        assert!(init_geo_client(Duration::from_secs(1)).is_ok());
        assert!(init_api_client(Duration::from_secs(1)).is_ok());
    }
}
