use crate::models::*;

use super::{
    capture, cell, header_has, looks_like_ipv4, parse_duration_secs, parse_number, prompt_hostname,
    split_tokens, table_rows, VendorParser,
};

/// Huawei VRP
pub struct HuaweiParser;

impl VendorParser for HuaweiParser {
    fn vendor(&self) -> Vendor {
        Vendor::Huawei
    }

    fn default_command(&self, op: Operation) -> &'static str {
        match op {
            Operation::GetNeighbors => "display lldp neighbor brief",
            Operation::GetOspfPeers => "display ospf peer brief",
            Operation::GetInterfaces => "display interface brief",
            Operation::GetSystemInfo => "display version",
            Operation::TestConnection => "display clock",
        }
    }

    /// `display lldp neighbor brief`
    ///
    /// ```text
    /// Local Intf       Neighbor Dev             Neighbor Intf             Exptime(s)
    /// GE0/0/1          SW-DIST-01               GE0/0/24                  112
    /// ```
    fn parse_neighbors(&self, raw: &str) -> Vec<NeighborRecord> {
        table_rows(raw, |l| header_has(l, &["local intf", "neighbor dev"]))
            .into_iter()
            .filter_map(|line| {
                let tokens = split_tokens(line);
                if tokens.len() < 3 {
                    return None;
                }
                let mut record = NeighborRecord::new(tokens[0], tokens[1], line);
                record.remote_interface = cell(tokens[2]);
                record.hold_time = tokens.get(3).and_then(|t| parse_number(t));
                Some(record)
            })
            .collect()
    }

    /// `display ospf peer brief`
    fn parse_routing_peers(&self, raw: &str) -> Vec<RoutingPeerRecord> {
        table_rows(raw, |l| header_has(l, &["area id", "neighbor id", "state"]))
            .into_iter()
            .filter_map(|line| {
                let tokens = split_tokens(line);
                if tokens.len() < 4 || !looks_like_ipv4(tokens[2]) {
                    return None;
                }
                Some(RoutingPeerRecord {
                    router_id: tokens[2].to_string(),
                    address: None,
                    interface: tokens[1].to_string(),
                    state: tokens[3].to_string(),
                    priority: None,
                    dead_time: None,
                    area: cell(tokens[0]),
                    raw: line.trim_end().to_string(),
                })
            })
            .collect()
    }

    /// `display interface brief`. A leading `*` on the PHY column means
    /// administratively down.
    fn parse_interfaces(&self, raw: &str) -> Vec<InterfaceRecord> {
        table_rows(raw, |l| header_has(l, &["interface", "phy", "protocol"]))
            .into_iter()
            .filter_map(|line| {
                let tokens = split_tokens(line);
                if tokens.len() < 3 {
                    return None;
                }
                let phy = tokens[1];
                let admin_down = phy.starts_with('*');
                let oper = phy
                    .trim_start_matches('*')
                    .split('(')
                    .next()
                    .unwrap_or_default()
                    .to_lowercase();
                let mut record = InterfaceRecord::named(tokens[0]);
                record.admin_status = Some(if admin_down { "down" } else { "up" }.to_string());
                record.oper_status = cell(&oper);
                Some(record)
            })
            .collect()
    }

    fn parse_system_info(&self, raw: &str) -> SystemInfo {
        let uptime = capture(r"uptime is\s+([^\r\n]+)", raw);
        SystemInfo {
            hostname: capture(r"(?m)^\s*sysname\s+(\S+)", raw).or_else(|| prompt_hostname(raw)),
            model: capture(r"(?mi)^\s*HUAWEI\s+(\S+)[^\r\n]*uptime is", raw),
            serial_number: capture(
                r"(?i)(?:ESN of (?:slot|device|master)[^:\r\n]*|Equipment SN|Serial Number)\s*:\s*(\S+)",
                raw,
            ),
            software_version: capture(r"(?i)VRP \(R\) software,\s*Version\s+([^\r\n]+)", raw),
            uptime_seconds: uptime.as_deref().and_then(parse_duration_secs),
            uptime,
        }
    }
}
