use serde::{Deserialize, Serialize};

// Records produced by the vendor parsers. They carry only what the CLI
// output reported; persistence adds identity and timestamps.

/// A link-layer neighbor row from an LLDP table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub local_interface: String,
    pub remote_device_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_chassis_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<String>,
    pub raw: String,
}

impl NeighborRecord {
    pub fn new(local_interface: &str, remote_device_name: &str, raw: &str) -> Self {
        Self {
            local_interface: local_interface.to_string(),
            remote_device_name: remote_device_name.to_string(),
            remote_interface: None,
            remote_ip: None,
            remote_chassis_id: None,
            hold_time: None,
            capabilities: None,
            raw: raw.trim_end().to_string(),
        }
    }
}

/// An OSPF adjacency row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingPeerRecord {
    pub router_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub interface: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    pub raw: String,
}

/// One row of an interface summary table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oper_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl InterfaceRecord {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// System identity pulled from version output. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
}

impl SystemInfo {
    pub fn is_empty(&self) -> bool {
        self.hostname.is_none()
            && self.model.is_none()
            && self.serial_number.is_none()
            && self.software_version.is_none()
            && self.uptime.is_none()
    }
}
