//! Connection harvesting.
//!
//! Runs the namespace command ([`CommandRunner`]) and parses its output
//! ([`parse_connections`]). [`Harvester`] ties the two together and bounds how
//! many commands run at the same time.

mod parse;
mod runner;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::error_handling::{HarvestError, InfoType, ProcessingStats, WarningType};
use crate::initialization::init_semaphore;

// Re-export public API
pub use parse::parse_connections;
pub use runner::{CommandRunner, NsenterRunner};
pub use types::{ConnectionRecord, ParsedConnections};

/// Harvests and parses connections, at most `max_concurrent` at a time.
///
/// No caching happens here: every call runs the command again.
pub struct Harvester {
    runner: Arc<dyn CommandRunner>,
    limiter: Arc<Semaphore>,
    wait_timeout: Duration,
    stats: Arc<ProcessingStats>,
}

impl Harvester {
    /// `wait_timeout` bounds how long a caller queues for a free slot.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        max_concurrent: usize,
        wait_timeout: Duration,
        stats: Arc<ProcessingStats>,
    ) -> Self {
        Self {
            runner,
            limiter: init_semaphore(max_concurrent),
            wait_timeout,
            stats,
        }
    }

    /// Runs one harvest.
    ///
    /// # Errors
    ///
    /// Returns the concrete [`HarvestError`]; it is logged and counted here, so
    /// callers only need to map it to their own "unavailable" state.
    pub async fn harvest(&self) -> Result<ParsedConnections, HarvestError> {
        let result = self.harvest_inner().await;
        match &result {
            Ok(parsed) => {
                self.stats.increment_info(InfoType::HarvestCompleted);
                self.stats.add_warnings(WarningType::ParseSkip, parsed.skipped);
                if parsed.skipped > 0 {
                    log::debug!(
                        "Harvest parsed {} connection(s), skipped {} malformed line(s)",
                        parsed.records.len(),
                        parsed.skipped
                    );
                }
            }
            Err(e) => {
                self.stats.increment_error(e.error_type());
                log::warn!("Connection harvest failed: {}", e);
            }
        }
        result
    }

    async fn harvest_inner(&self) -> Result<ParsedConnections, HarvestError> {
        let _permit = match tokio::time::timeout(self.wait_timeout, self.limiter.acquire()).await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_closed)) => {
                return Err(HarvestError::Io(std::io::Error::other(
                    "harvest limiter closed",
                )))
            }
            Err(_) => return Err(HarvestError::Timeout(self.wait_timeout)),
        };

        let raw = self.runner.run().await?;
        Ok(parse_connections(&raw))
    }
}
