use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mechanism a neighbor was observed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Link-layer discovery (LLDP)
    Lldp,
    /// Routing adjacency (OSPF)
    Ospf,
    /// Legacy discovery (CDP)
    Cdp,
    Manual,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Lldp => "lldp",
            Protocol::Ospf => "ospf",
            Protocol::Cdp => "cdp",
            Protocol::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lldp" => Some(Protocol::Lldp),
            "ospf" => Some(Protocol::Ospf),
            "cdp" => Some(Protocol::Cdp),
            "manual" => Some(Protocol::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Neighbor is a persisted discovery record, unique per
/// (device, local interface, protocol)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: i64,
    pub device_id: i64,
    pub local_interface: String,
    pub protocol: Protocol,
    pub remote_device_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_device_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
    pub discovered_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// NeighborObservation is one sighting to upsert, before remote resolution
#[derive(Debug, Clone)]
pub struct NeighborObservation {
    pub local_interface: String,
    pub protocol: Protocol,
    pub remote_device_name: String,
    pub remote_interface: Option<String>,
    pub remote_ip: Option<String>,
    pub raw_data: String,
}
