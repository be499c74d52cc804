//! Client-side model of the live connection table.
//!
//! Rows are replaced wholesale on each successful poll. Location cells are
//! keyed by [`cell_id`] and filled in one by one as enrichment answers arrive,
//! in whatever order they arrive.

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Local};

use crate::geoip::GeoInfo;
use crate::harvest::ConnectionRecord;
use crate::server::ConnectionsResponse;

/// Where the current poll cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    FetchingConnections,
    /// Rows are on screen, enrichment not started yet
    Rendered,
    /// Enrichment requests outstanding
    Enriching { pending: usize },
}

/// State of one location cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellState {
    Loading,
    Resolved(GeoInfo),
    /// The lookup request itself failed; the raw IP is shown
    Unavailable,
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub record: ConnectionRecord,
    pub cell_id: String,
}

/// Everything the view needs to draw the table.
#[derive(Debug, Clone)]
pub struct ConnectionTable {
    phase: PollPhase,
    banner: Option<String>,
    rows: Vec<Row>,
    cells: HashMap<String, CellState>,
    updated_at: Option<DateTime<Local>>,
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable identifier of the location cell for `ip`.
///
/// Built from the canonical text form with `.` -> `_` and `:` -> `-`. Those
/// two characters never appear in the canonical form otherwise and get
/// distinct replacements, so two different addresses never share an id.
pub fn cell_id(ip: IpAddr) -> String {
    let text = ip.to_canonical().to_string();
    let mut id = String::with_capacity(text.len() + 4);
    id.push_str("geo-");
    for c in text.chars() {
        match c {
            '.' => id.push('_'),
            ':' => id.push('-'),
            c if c.is_ascii_alphanumeric() => id.push(c.to_ascii_lowercase()),
            _ => id.push('x'),
        }
    }
    id
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self {
            phase: PollPhase::Idle,
            banner: None,
            rows: Vec::new(),
            cells: HashMap::new(),
            updated_at: None,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Error shown instead of the table, if the last fetch failed.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn updated_at(&self) -> Option<DateTime<Local>> {
        self.updated_at
    }

    pub fn cell(&self, ip: IpAddr) -> Option<&CellState> {
        self.cells.get(&cell_id(ip))
    }

    pub fn begin_fetch(&mut self) {
        self.phase = PollPhase::FetchingConnections;
    }

    /// Replaces the table with an error banner.
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.banner = Some(message.into());
        self.rows.clear();
        self.cells.clear();
        self.phase = PollPhase::Idle;
        self.updated_at = Some(Local::now());
    }

    /// Loads a fresh connection list and returns the addresses to enrich.
    ///
    /// Every location cell starts out as [`CellState::Loading`].
    pub fn load(&mut self, response: ConnectionsResponse) -> Vec<IpAddr> {
        self.banner = None;
        self.cells.clear();

        let mut to_enrich = Vec::new();
        let row_ips = response.connections.iter().map(|r| r.remote_ip);
        for ip in response.unique_ips.iter().copied().chain(row_ips) {
            let id = cell_id(ip);
            if !self.cells.contains_key(&id) {
                self.cells.insert(id, CellState::Loading);
                to_enrich.push(ip);
            }
        }

        self.rows = response
            .connections
            .into_iter()
            .map(|record| Row {
                cell_id: cell_id(record.remote_ip),
                record,
            })
            .collect();
        self.updated_at = Some(Local::now());
        self.phase = if to_enrich.is_empty() {
            PollPhase::Idle
        } else {
            PollPhase::Rendered
        };
        to_enrich
    }

    /// Marks enrichment as started for the loading cells.
    pub fn begin_enrichment(&mut self) {
        let pending = self.pending();
        if pending > 0 {
            self.phase = PollPhase::Enriching { pending };
        }
    }

    /// Fills in one cell. Returns false when the cell is gone or already filled.
    pub fn resolve(&mut self, ip: IpAddr, result: Option<GeoInfo>) -> bool {
        let Some(cell) = self.cells.get_mut(&cell_id(ip)) else {
            return false;
        };
        if *cell != CellState::Loading {
            return false;
        }
        *cell = match result {
            Some(geo) => CellState::Resolved(geo),
            None => CellState::Unavailable,
        };

        if let PollPhase::Enriching { .. } | PollPhase::Rendered = self.phase {
            let pending = self.pending();
            self.phase = if pending == 0 {
                PollPhase::Idle
            } else {
                PollPhase::Enriching { pending }
            };
        }
        true
    }

    /// Text for the location column of `ip`.
    ///
    /// Falls back to the bare address whenever nothing better is known.
    pub fn location_text(&self, ip: IpAddr) -> String {
        match self.cell(ip) {
            Some(CellState::Loading) => "Loading...".to_string(),
            Some(CellState::Resolved(geo)) => match (geo.location(), &geo.org) {
                (Some(location), Some(org)) => format!("{} ({})", location, org),
                (Some(location), None) => location,
                (None, Some(org)) => org.clone(),
                (None, None) => ip.to_string(),
            },
            Some(CellState::Unavailable) | None => ip.to_string(),
        }
    }

    fn pending(&self) -> usize {
        self.cells
            .values()
            .filter(|c| **c == CellState::Loading)
            .count()
    }
}
