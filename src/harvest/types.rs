//! Harvest data structures.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// One established TCP connection observed at harvest time.
///
/// Built fresh on every harvest and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub remote_ip: IpAddr,
    pub remote_port: u16,
    pub local_port: u16,
    pub status: String,
}

/// Result of parsing one batch of harvest output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedConnections {
    /// One record per well-formed line, in output order
    pub records: Vec<ConnectionRecord>,
    /// Distinct `remote_ip` values of `records`, in first-seen order
    pub unique_ips: Vec<IpAddr>,
    /// Number of non-blank lines that were dropped as malformed
    pub skipped: usize,
}
