//! Terminal rendering of the connection table.

use std::io::Write;
use std::sync::Mutex;

use colored::Colorize;

use super::table::{CellState, ConnectionTable, PollPhase};

/// Something that can draw the table.
///
/// Called after the list arrives and again after every single cell update.
pub trait TableView: Send + Sync {
    fn render(&self, table: &ConnectionTable);
}

/// Redraws the whole table on stdout.
#[derive(Debug, Default)]
pub struct TerminalView {
    // serializes redraws from concurrent enrichment tasks
    lock: Mutex<()>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableView for TerminalView {
    fn render(&self, table: &ConnectionTable) {
        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut out = std::io::stdout().lock();
        // clear screen, cursor home
        let _ = write!(out, "\x1b[2J\x1b[H{}", render_to_string(table, true));
        let _ = out.flush();
    }
}

/// Formats the table as text. `color` toggles ANSI styling.
pub fn render_to_string(table: &ConnectionTable, color: bool) -> String {
    let mut out = String::new();

    let updated = table
        .updated_at()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    let status = match table.phase() {
        PollPhase::Idle => "idle".to_string(),
        PollPhase::FetchingConnections => "refreshing".to_string(),
        PollPhase::Rendered => "loading locations".to_string(),
        PollPhase::Enriching { pending } => format!("resolving {} location(s)", pending),
    };

    let unique = {
        let mut ips: Vec<_> = table.rows().iter().map(|r| r.record.remote_ip).collect();
        ips.sort();
        ips.dedup();
        ips.len()
    };
    let title = format!(
        "Live connections | {} connection(s), {} unique IP(s) | updated {} | {}",
        table.rows().len(),
        unique,
        updated,
        status
    );
    out.push_str(&paint(&title, color, |s| s.bold().to_string()));
    out.push('\n');

    if let Some(banner) = table.banner() {
        let line = format!("Error: {}", banner);
        out.push_str(&paint(&line, color, |s| s.red().bold().to_string()));
        out.push('\n');
        return out;
    }

    if table.rows().is_empty() {
        out.push_str(&paint("No established connections", color, |s| {
            s.dimmed().to_string()
        }));
        out.push('\n');
        return out;
    }

    let header = format!(
        "{:<40} {:>6} {:>6} {:<12} {}",
        "REMOTE IP", "PORT", "LOCAL", "STATUS", "LOCATION"
    );
    out.push_str(&paint(&header, color, |s| s.underline().to_string()));
    out.push('\n');

    for row in table.rows() {
        let ip = row.record.remote_ip;
        let location = table.location_text(ip);
        let location = match table.cell(ip) {
            Some(CellState::Loading) => paint(&location, color, |s| s.yellow().to_string()),
            Some(CellState::Resolved(geo)) if !geo.is_unknown() => {
                paint(&location, color, |s| s.green().to_string())
            }
            _ => location,
        };
        out.push_str(&format!(
            "{:<40} {:>6} {:>6} {:<12} {}\n",
            ip.to_string(),
            row.record.remote_port,
            row.record.local_port,
            row.record.status,
            location
        ));
    }
    out
}

fn paint(text: &str, color: bool, style: impl Fn(&str) -> String) -> String {
    if color {
        style(text)
    } else {
        text.to_string()
    }
}
