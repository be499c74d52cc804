//! Error handling and service statistics.
//!
//! This module provides:
//! - Error type definitions for each boundary (harvest, enrichment, poller)
//! - Service statistics tracking (errors, warnings, info metrics)
//!
//! Counters are categorized into:
//! - **Errors**: A boundary failed (the caller sees an error or a degraded answer)
//! - **Warnings**: Input was dropped and recovered locally
//! - **Info**: Cache behaviour and completed work

mod stats;
mod types;

// Re-export public API
pub use stats::ProcessingStats;
pub use types::{
    ConfigError, EnrichmentError, ErrorType, HarvestError, InfoType, InitializationError,
    PollError, WarningType,
};
