//! Error type definitions.
//!
//! This module defines the error enums for each boundary of the service and
//! the counter categories tracked by [`ProcessingStats`](super::ProcessingStats).

use std::time::Duration;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use reqwest::StatusCode;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Invalid configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A value is out of range or unparsable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Why the namespace command produced no usable output.
///
/// The distinction is kept for logs and counters only; callers of the API
/// see every variant as the same "unavailable" state.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// The command could not be started (binary missing, no permission).
    #[error("failed to spawn harvest command: {0}")]
    Spawn(#[source] std::io::Error),

    /// The command did not finish in time and was killed.
    #[error("harvest command timed out after {0:?}")]
    Timeout(Duration),

    /// The command exited with a non-zero status.
    #[error("harvest command exited with {code:?}: {stderr}")]
    ExitStatus {
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
        /// Trimmed stderr of the command
        stderr: String,
    },

    /// Waiting for or reading from the command failed.
    #[error("harvest command I/O error: {0}")]
    Io(#[source] std::io::Error),
}

impl HarvestError {
    /// Counter category for this failure.
    pub fn error_type(&self) -> ErrorType {
        match self {
            HarvestError::Spawn(_) => ErrorType::HarvestSpawnError,
            HarvestError::Timeout(_) => ErrorType::HarvestTimeout,
            HarvestError::ExitStatus { .. } => ErrorType::HarvestExitStatusError,
            HarvestError::Io(_) => ErrorType::HarvestIoError,
        }
    }
}

/// Why a geolocation lookup did not produce metadata.
#[derive(Error, Debug)]
pub enum EnrichmentError {
    /// Connection, TLS or body error from the HTTP client.
    #[error("geolocation request failed: {0}")]
    Request(#[from] ReqwestError),

    /// The request did not complete in time.
    #[error("geolocation request timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with a non-success status.
    #[error("geolocation service returned HTTP {0}")]
    Status(StatusCode),

    /// The service answered 200 with an error document (rate limit, reserved range).
    #[error("geolocation service reported an error: {0}")]
    Upstream(String),

    /// The document carried none of the fields we display.
    #[error("geolocation response has no location or organization fields")]
    MissingFields,
}

impl EnrichmentError {
    /// Counter category for this failure.
    pub fn error_type(&self) -> ErrorType {
        match self {
            EnrichmentError::Request(e) if e.is_timeout() => ErrorType::EnrichmentTimeout,
            EnrichmentError::Request(_) => ErrorType::EnrichmentRequestError,
            EnrichmentError::Timeout(_) => ErrorType::EnrichmentTimeout,
            EnrichmentError::Status(_) => ErrorType::EnrichmentStatusError,
            EnrichmentError::Upstream(_) => ErrorType::EnrichmentUpstreamError,
            EnrichmentError::MissingFields => ErrorType::EnrichmentMissingFields,
        }
    }
}

/// Errors returned by the poller's API client.
#[derive(Error, Debug)]
pub enum PollError {
    /// Transport-level failure.
    #[error("request to {url} failed: {source}")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: ReqwestError,
    },

    /// The API answered with a non-success status.
    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        /// Requested URL
        url: String,
        /// Response status
        status: StatusCode,
        /// `error` field of the body, or the raw body
        message: String,
    },

    /// The body could not be decoded.
    #[error("could not decode response from {url}: {source}")]
    Decode {
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: ReqwestError,
    },
}

/// Error counters tracked by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    // Harvest errors
    HarvestSpawnError,
    HarvestTimeout,
    HarvestExitStatusError,
    HarvestIoError,
    // Enrichment errors
    EnrichmentRequestError,
    EnrichmentTimeout,
    EnrichmentStatusError,
    EnrichmentUpstreamError,
    EnrichmentMissingFields,
    // Input errors
    InvalidIpInput,
    Unauthorized,
}

/// Recovered conditions worth counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum WarningType {
    /// A harvest output line was skipped
    ParseSkip,
}

/// Informational counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    // Harvest
    HarvestCompleted,
    // Geolocation cache
    CacheHit,
    NegativeCacheHit,
    CacheMiss,
    CoalescedLookup,
    ExternalLookup,
    NonPublicAddress,
    CacheEviction,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    /// Human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::HarvestSpawnError => "Harvest spawn error",
            ErrorType::HarvestTimeout => "Harvest timeout",
            ErrorType::HarvestExitStatusError => "Harvest exit status error",
            ErrorType::HarvestIoError => "Harvest I/O error",
            ErrorType::EnrichmentRequestError => "Enrichment request error",
            ErrorType::EnrichmentTimeout => "Enrichment timeout",
            ErrorType::EnrichmentStatusError => "Enrichment status error",
            ErrorType::EnrichmentUpstreamError => "Enrichment upstream error",
            ErrorType::EnrichmentMissingFields => "Enrichment missing fields",
            ErrorType::InvalidIpInput => "Invalid IP input",
            ErrorType::Unauthorized => "Unauthorized request",
        }
    }

    /// Snake-case name used for metric labels.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ErrorType::HarvestSpawnError => "harvest_spawn",
            ErrorType::HarvestTimeout => "harvest_timeout",
            ErrorType::HarvestExitStatusError => "harvest_exit_status",
            ErrorType::HarvestIoError => "harvest_io",
            ErrorType::EnrichmentRequestError => "enrichment_request",
            ErrorType::EnrichmentTimeout => "enrichment_timeout",
            ErrorType::EnrichmentStatusError => "enrichment_status",
            ErrorType::EnrichmentUpstreamError => "enrichment_upstream",
            ErrorType::EnrichmentMissingFields => "enrichment_missing_fields",
            ErrorType::InvalidIpInput => "invalid_ip_input",
            ErrorType::Unauthorized => "unauthorized",
        }
    }
}

impl WarningType {
    /// Snake-case name used for metric labels.
    pub fn metric_label(&self) -> &'static str {
        match self {
            WarningType::ParseSkip => "parse_skip",
        }
    }
}

impl InfoType {
    /// Snake-case name used for metric labels.
    pub fn metric_label(&self) -> &'static str {
        match self {
            InfoType::HarvestCompleted => "harvest_completed",
            InfoType::CacheHit => "cache_hit",
            InfoType::NegativeCacheHit => "negative_cache_hit",
            InfoType::CacheMiss => "cache_miss",
            InfoType::CoalescedLookup => "coalesced_lookup",
            InfoType::ExternalLookup => "external_lookup",
            InfoType::NonPublicAddress => "non_public_address",
            InfoType::CacheEviction => "cache_eviction",
        }
    }
}
