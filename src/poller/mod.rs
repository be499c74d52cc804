//! Periodic client for the connection API.
//!
//! Each cycle fetches the connection list, renders it right away with every
//! location cell loading, then fires one independent `/api/ip-info` request per
//! unique address. Every answer updates exactly one cell and triggers a redraw,
//! so a slow lookup never holds back the rest of the table.

mod client;
mod render;
mod table;

use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error_handling::PollError;

// Re-export public API
pub use client::ApiClient;
pub use render::{render_to_string, TableView, TerminalView};
pub use table::{cell_id, CellState, ConnectionTable, PollPhase, Row};

/// Result of the list fetch of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The table was rendered and this many lookups were started
    Rendered { enrichments: usize },
    /// The list fetch failed and the error banner is shown
    Failed,
}

/// Drives poll cycles against one API.
pub struct Poller {
    client: ApiClient,
    view: Arc<dyn TableView>,
    table: Arc<Mutex<ConnectionTable>>,
    enrichments: Mutex<JoinSet<()>>,
    interval: Duration,
}

impl Poller {
    pub fn new(client: ApiClient, view: Arc<dyn TableView>, interval: Duration) -> Self {
        Self {
            client,
            view,
            table: Arc::new(Mutex::new(ConnectionTable::new())),
            enrichments: Mutex::new(JoinSet::new()),
            interval,
        }
    }

    /// Copy of the current table.
    pub fn snapshot(&self) -> ConnectionTable {
        lock(&*self.table).clone()
    }

    /// Polls every `interval` until `cancel` fires.
    ///
    /// Cancellation stops new cycles from being scheduled. A cycle already
    /// fetching runs to completion and outstanding lookups are awaited, each
    /// bounded by the client's request timeout.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.poll_once().await;
            self.reap_finished();
        }

        log::info!("Poller stopping, waiting for outstanding lookups");
        self.wait_for_enrichments().await;
    }

    /// Runs one cycle up to the point where lookups have been started.
    pub async fn poll_once(&self) -> CycleOutcome {
        self.update(|table| table.begin_fetch());

        let response = match self.client.fetch_connections().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Failed to fetch connections: {}", e);
                let message = match &e {
                    PollError::Status { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                self.update(|table| table.show_error(message));
                return CycleOutcome::Failed;
            }
        };

        log::debug!(
            "Fetched {} connection(s) from {} unique IP(s)",
            response.connections.len(),
            response.unique_ips.len()
        );
        let to_enrich = self.update(|table| table.load(response));
        if to_enrich.is_empty() {
            return CycleOutcome::Rendered { enrichments: 0 };
        }

        self.update(|table| table.begin_enrichment());
        let mut tasks = lock(&self.enrichments);
        for ip in &to_enrich {
            tasks.spawn(enrich(
                self.client.clone(),
                self.table.clone(),
                self.view.clone(),
                *ip,
            ));
        }
        CycleOutcome::Rendered {
            enrichments: to_enrich.len(),
        }
    }

    /// Waits until every started lookup has updated its cell.
    pub async fn wait_for_enrichments(&self) {
        let mut tasks = std::mem::take(&mut *lock(&self.enrichments));
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                log::warn!("Location lookup task failed: {}", e);
            }
        }
    }

    fn reap_finished(&self) {
        let mut tasks = lock(&self.enrichments);
        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                log::warn!("Location lookup task failed: {}", e);
            }
        }
    }

    /// Applies `f` to the table and redraws.
    fn update<T>(&self, f: impl FnOnce(&mut ConnectionTable) -> T) -> T {
        let mut table = lock(&*self.table);
        let result = f(&mut table);
        self.view.render(&table);
        result
    }
}

async fn enrich(
    client: ApiClient,
    table: Arc<Mutex<ConnectionTable>>,
    view: Arc<dyn TableView>,
    ip: IpAddr,
) {
    let result = match client.fetch_ip_info(ip).await {
        Ok(geo) => Some(geo),
        Err(e) => {
            log::debug!("Location lookup for {} failed: {}", ip, e);
            None
        }
    };

    let mut table = lock(&*table);
    if table.resolve(ip, result) {
        view.render(&table);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
