use sqlx::{Row, sqlite::SqliteRow};

use crate::models::*;

/// Empty string columns read back as None
pub fn none_if_empty(opt: Option<String>) -> Option<String> {
    opt.filter(|s| !s.is_empty())
}

/// Optional text for a NOT NULL DEFAULT '' column
pub fn empty_if_none(opt: Option<&str>) -> &str {
    opt.unwrap_or("")
}

/// Map a SQLite row to a Device struct
pub fn map_device_row(row: &SqliteRow) -> Device {
    let vendor: String = row.get("vendor");
    Device {
        id: row.get("id"),
        name: row.get("name"),
        hostname: row.get("hostname"),
        ip: row.get("ip"),
        vendor: Vendor::from_tag(&vendor),
        ssh_port: row.get("ssh_port"),
        credential_id: row.try_get::<Option<i64>, _>("credential_id").ok().flatten(),
        status: row.get("status"),
        model: none_if_empty(row.get("model")),
        serial_number: none_if_empty(row.get("serial_number")),
        software_version: none_if_empty(row.get("software_version")),
        uptime: none_if_empty(row.get("uptime")),
        last_seen: row.get("last_seen"),
        last_error: none_if_empty(row.get("last_error")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Map a SQLite row to a Neighbor struct. Rows with an unknown protocol
/// tag are dropped.
pub fn map_neighbor_row(row: &SqliteRow) -> Option<Neighbor> {
    let protocol: String = row.get("protocol");
    Some(Neighbor {
        id: row.get("id"),
        device_id: row.get("device_id"),
        local_interface: row.get("local_interface"),
        protocol: Protocol::parse(&protocol)?,
        remote_device_name: row.get("remote_device_name"),
        remote_interface: none_if_empty(row.get("remote_interface")),
        remote_ip: none_if_empty(row.get("remote_ip")),
        remote_device_id: row.try_get::<Option<i64>, _>("remote_device_id").ok().flatten(),
        raw_data: none_if_empty(row.get("raw_data")),
        discovered_at: row.get("discovered_at"),
        last_updated: row.get("last_updated"),
    })
}

/// Map a SQLite row to a Link struct
pub fn map_link_row(row: &SqliteRow) -> Link {
    Link {
        id: row.get("id"),
        source_device_id: row.get("source_device_id"),
        target_device_id: row.get("target_device_id"),
        source_interface: none_if_empty(row.get("source_interface")),
        target_interface: none_if_empty(row.get("target_interface")),
        link_type: row.get("link_type"),
        status: row.get("status"),
        bandwidth: row.try_get::<Option<i64>, _>("bandwidth").ok().flatten(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
