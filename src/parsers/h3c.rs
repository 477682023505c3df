use crate::models::*;

use super::{
    capture, cell, header_has, looks_like_ipv4, parse_duration_secs, parse_number, prompt_hostname,
    split_tokens, table_rows, VendorParser,
};

/// H3C / HPE Comware
pub struct H3cParser;

/// Interface name prefixes used in Comware brief tables
const INTERFACE_PREFIXES: &[&str] = &[
    "GE", "XGE", "FGE", "HGE", "WGE", "M-GE", "MGE", "Vlan", "Loop", "BAGG", "RAGG", "Tun",
    "NULL", "InLoop", "Ten-GigabitEthernet", "GigabitEthernet", "M-GigabitEthernet",
    "Bridge-Aggregation", "Route-Aggregation",
];

impl VendorParser for H3cParser {
    fn vendor(&self) -> Vendor {
        Vendor::H3c
    }

    fn default_command(&self, op: Operation) -> &'static str {
        match op {
            Operation::GetNeighbors => "display lldp neighbor-information list",
            Operation::GetOspfPeers => "display ospf peer",
            Operation::GetInterfaces => "display interface brief",
            Operation::GetSystemInfo => "display version",
            Operation::TestConnection => "display clock",
        }
    }

    /// `display lldp neighbor-information list`
    ///
    /// ```text
    /// System Name          Local Interface Chassis ID      Port ID
    /// SW-DIST-01           GE1/0/1         0011-2233-4455  GigabitEthernet1/0/24
    /// ```
    ///
    /// System names may contain spaces, so columns are taken from the right.
    fn parse_neighbors(&self, raw: &str) -> Vec<NeighborRecord> {
        table_rows(raw, |l| header_has(l, &["system name", "local interface"]))
            .into_iter()
            .filter_map(|line| {
                let tokens = split_tokens(line);
                let n = tokens.len();
                if n < 4 {
                    return None;
                }
                let name = tokens[..n - 3].join(" ");
                let mut record = NeighborRecord::new(tokens[n - 3], &name, line);
                record.remote_chassis_id = cell(tokens[n - 2]);
                record.remote_interface = cell(tokens[n - 1]);
                Some(record)
            })
            .collect()
    }

    /// `display ospf peer`
    ///
    /// ```text
    ///  Area: 0.0.0.0
    ///  Router ID       Address         Pri Dead-Time  State             Interface
    ///  10.0.0.2        192.168.1.2     1   37         Full/DR           GE1/0/1
    /// ```
    fn parse_routing_peers(&self, raw: &str) -> Vec<RoutingPeerRecord> {
        let mut peers = Vec::new();
        let mut area = None;
        // One pass per area block, each with its own header
        for block in raw.split("Area:").skip(1) {
            if let Some(id) = block.split_whitespace().next() {
                area = cell(id);
            }
            peers.extend(peer_rows(block, area.clone()));
        }
        if peers.is_empty() {
            peers = peer_rows(raw, None);
        }
        peers
    }

    /// `display interface brief`. Route-mode rows carry protocol state and
    /// an address; bridge-mode rows carry speed, duplex and PVID.
    fn parse_interfaces(&self, raw: &str) -> Vec<InterfaceRecord> {
        raw.lines()
            .filter_map(|line| {
                let tokens = split_tokens(line);
                if tokens.len() < 2 || !is_interface_name(tokens[0]) {
                    return None;
                }
                let link = tokens[1].to_uppercase();
                if !matches!(link.as_str(), "UP" | "DOWN" | "ADM" | "STBY" | "UP(S)" | "DOWN(S)") {
                    return None;
                }

                let mut record = InterfaceRecord::named(tokens[0]);
                let admin_down = link == "ADM";
                record.admin_status = Some(if admin_down { "down" } else { "up" }.to_string());
                record.oper_status = Some(match link.as_str() {
                    "ADM" => "down".to_string(),
                    "STBY" => "standby".to_string(),
                    other => other.trim_end_matches("(S)").to_lowercase(),
                });

                let is_route_row = tokens
                    .get(2)
                    .map(|t| matches!(t.to_uppercase().as_str(), "UP" | "DOWN" | "UP(S)" | "DOWN(S)"))
                    .unwrap_or(false);
                if is_route_row {
                    record.ip_address = tokens.get(3).filter(|t| looks_like_ipv4(t)).map(|t| t.to_string());
                    let desc_from = if record.ip_address.is_some() || tokens.get(3) == Some(&"--") { 4 } else { 3 };
                    record.description = tokens.get(desc_from..).and_then(|rest| cell(&rest.join(" ")));
                } else {
                    record.speed = tokens.get(2).and_then(|t| cell(t));
                    record.duplex = tokens.get(3).and_then(|t| cell(t));
                    record.vlan = tokens.get(5).and_then(|t| cell(t));
                    record.description = tokens.get(6..).and_then(|rest| cell(&rest.join(" ")));
                }
                Some(record)
            })
            .collect()
    }

    fn parse_system_info(&self, raw: &str) -> SystemInfo {
        let uptime = capture(r"uptime is\s+([^\r\n]+)", raw);
        SystemInfo {
            hostname: capture(r"(?m)^\s*sysname\s+(\S+)", raw).or_else(|| prompt_hostname(raw)),
            model: capture(r"(?mi)^\s*(?:H3C|HPE)\s+(\S+)\s+uptime is", raw),
            serial_number: capture(r"(?i)DEVICE_SERIAL_NUMBER\s*:\s*(\S+)", raw),
            software_version: capture(r"(?i)Comware Software,\s*Version\s+([^\r\n]+)", raw),
            uptime_seconds: uptime.as_deref().and_then(parse_duration_secs),
            uptime,
        }
    }
}

fn is_interface_name(token: &str) -> bool {
    INTERFACE_PREFIXES.iter().any(|p| {
        token
            .strip_prefix(p)
            .and_then(|rest| rest.chars().next())
            .map_or(false, |c| c.is_ascii_digit())
    })
}

fn peer_rows(text: &str, area: Option<String>) -> Vec<RoutingPeerRecord> {
    table_rows(text, |l| header_has(l, &["router id", "address", "state"]))
        .into_iter()
        .filter_map(|line| {
            let tokens = split_tokens(line);
            if tokens.len() < 6 || !looks_like_ipv4(tokens[0]) {
                return None;
            }
            Some(RoutingPeerRecord {
                router_id: tokens[0].to_string(),
                address: cell(tokens[1]),
                interface: tokens[5].to_string(),
                state: tokens[4].to_string(),
                priority: parse_number(tokens[2]),
                dead_time: parse_number(tokens[3]),
                area: area.clone(),
                raw: line.trim_end().to_string(),
            })
        })
        .collect()
}
