use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// DeviceInterface is the last known state of one interface on a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInterface {
    pub id: i64,
    pub device_id: i64,
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
    pub updated_at: DateTime<Utc>,
}
