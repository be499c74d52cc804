//! Parsing of harvest command output.
//!
//! Each line holds two whitespace-separated endpoints, `local remote`, each of
//! the form `address:port`, optionally preceded by the two numeric queue
//! columns `ss` prints. Any other shape is skipped. IPv6 addresses may be
//! bracketed (`[::1]:443`) and are split on the last colon.

use std::collections::HashSet;
use std::net::IpAddr;

use crate::config::ESTABLISHED_STATUS;

use super::types::{ConnectionRecord, ParsedConnections};

/// Parses raw harvest output into records and the set of remote IPs.
///
/// Malformed lines are skipped and counted; they never abort the batch.
/// Empty input is a valid "no connections" result.
pub fn parse_connections(raw: &str) -> ParsedConnections {
    let mut parsed = ParsedConnections::default();
    let mut seen = HashSet::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line) {
            Some(record) => {
                if seen.insert(record.remote_ip) {
                    parsed.unique_ips.push(record.remote_ip);
                }
                parsed.records.push(record);
            }
            None => {
                log::debug!("Skipping malformed harvest line: {:?}", line);
                parsed.skipped += 1;
            }
        }
    }

    parsed
}

/// Accepts `local remote`, or `ss`'s `recv-q send-q local remote`.
fn parse_line(line: &str) -> Option<ConnectionRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let (local, remote) = match fields.as_slice() {
        [local, remote] => (*local, *remote),
        [recv_q, send_q, local, remote] if is_queue(recv_q) && is_queue(send_q) => {
            (*local, *remote)
        }
        _ => return None,
    };

    let (local_host, local_port) = split_endpoint(local)?;
    parse_host(local_host)?;
    let (remote_host, remote_port) = split_endpoint(remote)?;
    let remote_ip = parse_host(remote_host)?;

    Some(ConnectionRecord {
        remote_ip,
        remote_port,
        local_port,
        status: ESTABLISHED_STATUS.to_string(),
    })
}

fn is_queue(field: &str) -> bool {
    field.parse::<u64>().is_ok()
}

/// Splits `host:port` on the last colon.
fn split_endpoint(endpoint: &str) -> Option<(&str, u16)> {
    let (host, port) = endpoint.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    let port = port.parse::<u16>().ok()?;
    Some((host, port))
}

/// Parses a host part, accepting `[v6]` brackets and `%zone` suffixes.
///
/// IPv4-mapped IPv6 addresses are reported as plain IPv4.
fn parse_host(host: &str) -> Option<IpAddr> {
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    let host = host.split_once('%').map_or(host, |(addr, _zone)| addr);
    host.parse::<IpAddr>().ok().map(|ip| ip.to_canonical())
}
