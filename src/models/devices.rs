use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical device status values
pub mod device_status {
    pub const ONLINE: &str = "online";
    pub const OFFLINE: &str = "offline";
    pub const UNKNOWN: &str = "unknown";
    pub const ERROR: &str = "error";
}

/// Vendor tag selecting a device's CLI dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Cisco,
    Huawei,
    H3c,
    Juniper,
    Arista,
    #[serde(other)]
    Other,
}

impl Vendor {
    /// Vendors with a dedicated parser
    pub const KNOWN: [Vendor; 5] = [
        Vendor::Cisco,
        Vendor::Huawei,
        Vendor::H3c,
        Vendor::Juniper,
        Vendor::Arista,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Cisco => "cisco",
            Vendor::Huawei => "huawei",
            Vendor::H3c => "h3c",
            Vendor::Juniper => "juniper",
            Vendor::Arista => "arista",
            Vendor::Other => "other",
        }
    }

    /// Map a stored vendor tag to a vendor. Case-insensitive, accepts the
    /// usual OS names, and never fails: anything unrecognised is `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "cisco" | "ios" | "ios-xe" | "iosxe" | "nxos" | "nx-os" => Vendor::Cisco,
            "huawei" | "vrp" => Vendor::Huawei,
            "h3c" | "comware" | "hp-comware" => Vendor::H3c,
            "juniper" | "junos" => Vendor::Juniper,
            "arista" | "eos" => Vendor::Arista,
            _ => Vendor::Other,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device is a switch or router registered by the device registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub hostname: String,
    pub ip: String,
    pub vendor: Vendor,
    pub ssh_port: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_id: Option<i64>,
    pub status: String, // online, offline, unknown, error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    /// Name shown on the topology graph
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.hostname
        } else {
            &self.name
        }
    }
}

/// CreateDeviceRequest is what the device registry submits to register a device
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    #[serde(default)]
    pub hostname: String,
    pub ip: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub ssh_port: Option<i32>,
    #[serde(default)]
    pub credential_id: Option<i64>,
}

/// Credential holds SSH login details referenced by devices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// CreateCredentialRequest for registering SSH credentials
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCredentialRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub username: String,
    pub password: String,
}
