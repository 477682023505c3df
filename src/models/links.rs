use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical link type values
pub mod link_type {
    pub const DISCOVERED: &str = "discovered";
    pub const MANUAL: &str = "manual";
}

/// Canonical link status values
pub mod link_status {
    pub const UP: &str = "up";
    pub const DOWN: &str = "down";
}

/// Link connects two devices. Direction is incidental: (A,B) and (B,A)
/// are the same link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub source_device_id: i64,
    pub target_device_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_interface: Option<String>,
    pub link_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Link {
    /// True if this link joins `a` and `b`, in either direction
    pub fn connects(&self, a: i64, b: i64) -> bool {
        (self.source_device_id == a && self.target_device_id == b)
            || (self.source_device_id == b && self.target_device_id == a)
    }

    /// The interface on `device_id`'s side of the link
    pub fn interface_of(&self, device_id: i64) -> Option<&str> {
        if self.source_device_id == device_id {
            self.source_interface.as_deref()
        } else if self.target_device_id == device_id {
            self.target_interface.as_deref()
        } else {
            None
        }
    }
}

/// CreateLinkRequest is used for manually declared links
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLinkRequest {
    pub source_device_id: i64,
    pub target_device_id: i64,
    #[serde(default)]
    pub source_interface: Option<String>,
    #[serde(default)]
    pub target_interface: Option<String>,
    #[serde(default = "default_link_type")]
    pub link_type: String,
    #[serde(default)]
    pub bandwidth: Option<i64>,
}

fn default_link_type() -> String {
    link_type::MANUAL.to_string()
}
