use crate::models::*;

use super::{
    capture, cell, header_has, looks_like_ipv4, parse_duration_secs, parse_number, prompt_hostname,
    split_tokens, split_wide, table_rows, VendorParser,
};

/// Cisco IOS / IOS-XE / NX-OS. Also the fallback for unknown vendors.
pub struct CiscoParser;

/// Status words of `show interfaces status`
const PORT_STATES: &[&str] = &[
    "connected",
    "notconnect",
    "disabled",
    "err-disabled",
    "errdisabled",
    "inactive",
    "monitoring",
    "suspended",
    "sfpabsent",
    "xcvrabsent",
    "noopermem",
    "faulty",
];

impl VendorParser for CiscoParser {
    fn vendor(&self) -> Vendor {
        Vendor::Cisco
    }

    fn default_command(&self, op: Operation) -> &'static str {
        match op {
            Operation::GetNeighbors => "show lldp neighbors",
            Operation::GetOspfPeers => "show ip ospf neighbor",
            Operation::GetInterfaces => "show interfaces status",
            Operation::GetSystemInfo => "show version",
            Operation::TestConnection => "show clock",
        }
    }

    /// `show lldp neighbors`
    ///
    /// ```text
    /// Device ID           Local Intf     Hold-time  Capability      Port ID
    /// SW-DIST-01          Gi1/0/1        120        B,R             Gi1/0/24
    /// ```
    ///
    /// The capability cell may be empty, so the port is always the last
    /// column.
    fn parse_neighbors(&self, raw: &str) -> Vec<NeighborRecord> {
        table_rows(raw, |l| header_has(l, &["device id", "local intf"]))
            .into_iter()
            .filter_map(|line| {
                let mut cols = split_wide(line);
                if cols.len() < 3 || cols[0].contains(' ') {
                    // A 20-character device ID leaves a single space before the next column
                    cols = split_tokens(line);
                }
                if cols.len() < 3 {
                    return None;
                }
                let last = cols.len() - 1;
                let mut record = NeighborRecord::new(cols[1], cols[0], line);
                record.remote_interface = cell(cols[last]);
                if cols.len() >= 4 {
                    record.hold_time = parse_number(cols[2]);
                }
                if cols.len() >= 5 {
                    record.capabilities = cell(&cols[3..last].join(" "));
                }
                Some(record)
            })
            .collect()
    }

    /// `show ip ospf neighbor`
    fn parse_routing_peers(&self, raw: &str) -> Vec<RoutingPeerRecord> {
        table_rows(raw, |l| header_has(l, &["neighbor id", "state", "interface"]))
            .into_iter()
            .filter_map(|line| {
                let tokens = split_tokens(line);
                if tokens.len() < 5 || !looks_like_ipv4(tokens[0]) {
                    return None;
                }
                let tail = ospf_tail(&tokens[2..])?;
                Some(RoutingPeerRecord {
                    router_id: tokens[0].to_string(),
                    address: tail.address,
                    interface: tail.interface,
                    state: tail.state,
                    priority: parse_number(tokens[1]),
                    dead_time: tail.dead_time,
                    area: None,
                    raw: line.trim_end().to_string(),
                })
            })
            .collect()
    }

    /// `show interfaces status`
    fn parse_interfaces(&self, raw: &str) -> Vec<InterfaceRecord> {
        table_rows(raw, |l| header_has(l, &["port", "status", "vlan"]))
            .into_iter()
            .filter_map(port_status_row)
            .collect()
    }

    fn parse_system_info(&self, raw: &str) -> SystemInfo {
        let uptime = capture(r"uptime is\s+([^\r\n]+)", raw);
        SystemInfo {
            hostname: capture(r"(?m)^\s*Device name:\s*(\S+)", raw)
                .or_else(|| capture(r"(?m)^\s*(\S+)\s+uptime is", raw).filter(|h| h != "Kernel"))
                .or_else(|| prompt_hostname(raw)),
            model: capture(r"(?mi)^\s*Model number\s*:\s*(\S+)", raw)
                .or_else(|| capture(r"(?m)^\s*cisco\s+(\S+)[^\r\n]*(?:processor|chassis)", raw)),
            serial_number: capture(r"(?mi)^\s*System serial number\s*:\s*(\S+)", raw)
                .or_else(|| capture(r"(?i)Processor board ID\s+(\S+)", raw)),
            software_version: capture(r"(?m)^\s*NXOS:\s*version\s+(\S+)", raw)
                .or_else(|| capture(r"(?i)Software[^\r\n]*,\s*Version\s+([^\s,]+)", raw)),
            uptime_seconds: uptime.as_deref().and_then(parse_duration_secs),
            uptime,
        }
    }
}

pub(super) struct OspfTail {
    pub state: String,
    pub dead_time: Option<u32>,
    pub address: Option<String>,
    pub interface: String,
}

/// Parse `<state...> <dead time> <address> <interface>`. The state can
/// span tokens (`FULL/  -`), so the dead timer is located by its colon.
pub(super) fn ospf_tail(tokens: &[&str]) -> Option<OspfTail> {
    let dead_idx = tokens.iter().position(|t| t.contains(':'))?;
    if dead_idx == 0 || tokens.len() < dead_idx + 3 {
        return None;
    }
    Some(OspfTail {
        state: tokens[..dead_idx].concat(),
        dead_time: parse_duration_secs(tokens[dead_idx]).and_then(|s| u32::try_from(s).ok()),
        address: cell(tokens[dead_idx + 1]),
        interface: tokens[dead_idx + 2].to_string(),
    })
}

/// One row of `show interfaces status`:
/// `Port  Name  Status  Vlan  Duplex  Speed  Type`.
///
/// The name column is free text and the duplex/speed cells are separated
/// by single spaces, so the row is anchored on the status word.
pub(super) fn port_status_row(line: &str) -> Option<InterfaceRecord> {
    let tokens = split_tokens(line);
    let status_idx = tokens
        .iter()
        .skip(1)
        .position(|t| PORT_STATES.contains(&t.to_lowercase().as_str()))?
        + 1;

    let status = tokens[status_idx].to_lowercase();
    let mut record = InterfaceRecord::named(tokens[0]);
    record.description = cell(&tokens[1..status_idx].join(" "));
    record.admin_status = Some(if status == "disabled" { "down" } else { "up" }.to_string());
    record.oper_status = Some(if status == "connected" { "up".to_string() } else { status });
    record.vlan = tokens.get(status_idx + 1).and_then(|t| cell(t));
    record.duplex = tokens.get(status_idx + 2).and_then(|t| cell(t));
    record.speed = tokens.get(status_idx + 3).and_then(|t| cell(t));
    Some(record)
}
