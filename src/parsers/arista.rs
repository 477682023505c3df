use crate::models::*;

use super::cisco::{ospf_tail, port_status_row};
use super::{
    capture, cell, header_has, looks_like_ipv4, parse_duration_secs, parse_number, prompt_hostname,
    split_tokens, split_wide, table_rows, VendorParser,
};

/// Arista EOS. Table shapes follow IOS closely, with extra
/// instance/VRF columns in the OSPF table.
pub struct AristaParser;

impl VendorParser for AristaParser {
    fn vendor(&self) -> Vendor {
        Vendor::Arista
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
    /// Port          Neighbor Device ID       Neighbor Port ID    TTL
    /// ---------- ------------------------ ---------------------- ---
    /// Et1           SW-DIST-01               Ethernet1           120
    /// ```
    fn parse_neighbors(&self, raw: &str) -> Vec<NeighborRecord> {
        table_rows(raw, |l| header_has(l, &["port", "neighbor device id"]))
            .into_iter()
            .filter_map(|line| {
                let cols = split_wide(line);
                if cols.len() < 3 {
                    return None;
                }
                let mut record = NeighborRecord::new(cols[0], cols[1], line);
                record.remote_interface = cell(cols[2]);
                record.hold_time = cols.get(3).and_then(|t| parse_number(t));
                Some(record)
            })
            .collect()
    }

    /// `show ip ospf neighbor`
    ///
    /// ```text
    /// Neighbor ID     Instance VRF      Pri State                  Dead Time   Address         Interface
    /// 10.0.0.2        1        default  0   FULL                   00:00:33    10.1.1.2        Ethernet1
    /// ```
    fn parse_routing_peers(&self, raw: &str) -> Vec<RoutingPeerRecord> {
        table_rows(raw, |l| header_has(l, &["neighbor id", "state", "address"]))
            .into_iter()
            .filter_map(|line| {
                let tokens = split_tokens(line);
                if tokens.len() < 8 || !looks_like_ipv4(tokens[0]) {
                    return None;
                }
                let tail = ospf_tail(&tokens[4..])?;
                Some(RoutingPeerRecord {
                    router_id: tokens[0].to_string(),
                    address: tail.address,
                    interface: tail.interface,
                    state: tail.state,
                    priority: parse_number(tokens[3]),
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
        let uptime = capture(r"(?mi)^\s*Uptime:\s*([^\r\n]+)", raw);
        SystemInfo {
            hostname: capture(r"(?mi)^\s*Hostname:\s*(\S+)", raw).or_else(|| prompt_hostname(raw)),
            model: capture(r"(?m)^\s*Arista\s+(\S+)", raw),
            serial_number: capture(r"(?mi)^\s*Serial number:\s*(\S+)", raw),
            software_version: capture(r"(?mi)^\s*Software image version:\s*(\S+)", raw),
            uptime_seconds: uptime.as_deref().and_then(parse_duration_secs),
            uptime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lldp_neighbors() {
        let raw = "\
Last table change time   : 0:11:42 ago
Number of table inserts  : 3
Number of table deletes  : 0

Port          Neighbor Device ID       Neighbor Port ID    TTL
---------- ------------------------ ---------------------- ---
Et1           SW-DIST-01               Ethernet1           120
Ma1           mgmt-sw.lab              Gi0/12              120
";
        let neighbors = AristaParser.parse_neighbors(raw);
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].local_interface, "Et1");
        assert_eq!(neighbors[0].remote_device_name, "SW-DIST-01");
        assert_eq!(neighbors[0].remote_interface.as_deref(), Some("Ethernet1"));
        assert_eq!(neighbors[0].hold_time, Some(120));
        assert_eq!(neighbors[1].remote_device_name, "mgmt-sw.lab");
    }

    #[test]
    fn test_ospf_neighbors() {
        let raw = "\
Neighbor ID     Instance VRF      Pri State                  Dead Time   Address         Interface
10.0.0.2        1        default  0   FULL                   00:00:33    10.1.1.2        Ethernet1
10.0.0.3        1        default  1   FULL/DR                00:00:31    10.1.1.6        Vlan100
";
        let peers = AristaParser.parse_routing_peers(raw);
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0].router_id, "10.0.0.2");
        assert_eq!(peers[0].priority, Some(0));
        assert_eq!(peers[0].state, "FULL");
        assert_eq!(peers[0].dead_time, Some(33));
        assert_eq!(peers[0].address.as_deref(), Some("10.1.1.2"));
        assert_eq!(peers[1].interface, "Vlan100");
    }

    #[test]
    fn test_interfaces_status() {
        let raw = "\
Port       Name        Status       Vlan     Duplex Speed  Type            Flags Encapsulation
Et1        to-dist-01  connected    trunk    full   10G    10GBASE-SR
Et2                    notconnect   1        full   10G    Not Present
Ma1                    connected    routed   a-full a-1G   10/100/1000
";
        let ifaces = AristaParser.parse_interfaces(raw);
        assert_eq!(ifaces.len(), 3);
        assert_eq!(ifaces[0].description.as_deref(), Some("to-dist-01"));
        assert_eq!(ifaces[0].speed.as_deref(), Some("10G"));
        assert_eq!(ifaces[1].oper_status.as_deref(), Some("notconnect"));
        assert_eq!(ifaces[2].vlan.as_deref(), Some("routed"));
    }

    #[test]
    fn test_version() {
        let raw = "\
Arista DCS-7050TX-64-R
Hardware version:    01.11
Serial number:       JPE12345678
System MAC address:  001c.7300.0001

Software image version: 4.27.0F
Architecture:           i686

Uptime:                 2 weeks, 1 day, 3 hours and 4 minutes
Total memory:           3993240 kB
";
        let info = AristaParser.parse_system_info(raw);
        assert_eq!(info.model.as_deref(), Some("DCS-7050TX-64-R"));
        assert_eq!(info.serial_number.as_deref(), Some("JPE12345678"));
        assert_eq!(info.software_version.as_deref(), Some("4.27.0F"));
        assert_eq!(info.uptime_seconds, Some(15 * 86_400 + 3 * 3600 + 240));
        assert_eq!(info.hostname, None);
    }
}
