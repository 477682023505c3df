use crate::models::*;

use super::{
    capture, cell, header_has, looks_like_ipv4, parse_duration_secs, parse_number, prompt_hostname,
    split_tokens, split_wide, table_rows, VendorParser,
};

/// Juniper Junos
pub struct JuniperParser;

impl VendorParser for JuniperParser {
    fn vendor(&self) -> Vendor {
        Vendor::Juniper
    }

    fn default_command(&self, op: Operation) -> &'static str {
        match op {
            Operation::GetNeighbors => "show lldp neighbors",
            Operation::GetOspfPeers => "show ospf neighbor",
            Operation::GetInterfaces => "show interfaces terse",
            Operation::GetSystemInfo => "show version",
            Operation::TestConnection => "show system uptime",
        }
    }

    /// `show lldp neighbors`
    ///
    /// ```text
    /// Local Interface    Parent Interface    Chassis Id          Port info          System Name
    /// ge-0/0/0           -                   00:11:22:33:44:55   ge-0/0/1           SW-DIST-01
    /// ```
    ///
    /// Older releases omit the parent interface column.
    fn parse_neighbors(&self, raw: &str) -> Vec<NeighborRecord> {
        let has_parent = raw
            .lines()
            .any(|l| header_has(l, &["local interface", "parent interface"]));
        table_rows(raw, |l| header_has(l, &["local interface", "chassis id"]))
            .into_iter()
            .filter_map(|line| {
                let cols = split_wide(line);
                let (chassis, port, name) = match (has_parent, cols.len()) {
                    (true, n) if n >= 5 => (cols[2], cols[3], cols[4..].join(" ")),
                    (false, n) if n >= 4 => (cols[1], cols[2], cols[3..].join(" ")),
                    _ => return None,
                };
                let mut record = NeighborRecord::new(cols[0], &name, line);
                record.remote_chassis_id = cell(chassis);
                record.remote_interface = cell(port);
                Some(record)
            })
            .collect()
    }

    /// `show ospf neighbor`
    fn parse_routing_peers(&self, raw: &str) -> Vec<RoutingPeerRecord> {
        table_rows(raw, |l| header_has(l, &["address", "interface", "state", "id"]))
            .into_iter()
            .filter_map(|line| {
                let tokens = split_tokens(line);
                if tokens.len() < 4 || !looks_like_ipv4(tokens[3]) {
                    return None;
                }
                Some(RoutingPeerRecord {
                    router_id: tokens[3].to_string(),
                    address: cell(tokens[0]),
                    interface: tokens[1].to_string(),
                    state: tokens[2].to_string(),
                    priority: tokens.get(4).and_then(|t| parse_number(t)),
                    dead_time: tokens.get(5).and_then(|t| parse_number(t)),
                    area: None,
                    raw: line.trim_end().to_string(),
                })
            })
            .collect()
    }

    /// `show interfaces terse`. Indented continuation lines (extra
    /// addresses) are skipped.
    fn parse_interfaces(&self, raw: &str) -> Vec<InterfaceRecord> {
        table_rows(raw, |l| header_has(l, &["interface", "admin", "link"]))
            .into_iter()
            .filter(|line| !line.starts_with(char::is_whitespace))
            .filter_map(|line| {
                let tokens = split_tokens(line);
                if tokens.len() < 3 {
                    return None;
                }
                let mut record = InterfaceRecord::named(tokens[0]);
                record.admin_status = cell(tokens[1]);
                record.oper_status = cell(tokens[2]);
                if tokens.get(3).map_or(false, |p| *p == "inet") {
                    record.ip_address = tokens.get(4).and_then(|t| cell(t));
                }
                Some(record)
            })
            .collect()
    }

    fn parse_system_info(&self, raw: &str) -> SystemInfo {
        let uptime = capture(r"(?m)^\s*System booted:[^\r\n]*\(([^)]+) ago\)", raw);
        SystemInfo {
            hostname: capture(r"(?m)^\s*Hostname:\s*(\S+)", raw).or_else(|| prompt_hostname(raw)),
            model: capture(r"(?m)^\s*Model:\s*(\S+)", raw),
            serial_number: capture(r"(?m)^\s*Chassis\s+(?:\S+\s+)?([A-Z0-9]{8,})\s+\S+", raw),
            software_version: capture(r"(?m)^\s*Junos:\s*(\S+)", raw)
                .or_else(|| capture(r"(?i)JUNOS[^\r\n]*\[([^\]]+)\]", raw)),
            uptime_seconds: uptime.as_deref().and_then(parse_duration_secs),
            uptime,
        }
    }
}
