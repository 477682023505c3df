use anyhow::Result;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::models::*;
use super::row_helpers::{empty_if_none, none_if_empty};

fn map_interface_row(row: &SqliteRow) -> DeviceInterface {
    DeviceInterface {
        id: row.get("id"),
        device_id: row.get("device_id"),
        name: row.get("name"),
        admin_status: none_if_empty(row.get("admin_status")),
        oper_status: none_if_empty(row.get("oper_status")),
        speed: none_if_empty(row.get("speed")),
        vlan: none_if_empty(row.get("vlan")),
        duplex: none_if_empty(row.get("duplex")),
        description: none_if_empty(row.get("description")),
        ip_address: none_if_empty(row.get("ip_address")),
        updated_at: row.get("updated_at"),
    }
}

pub struct InterfaceRepo;

impl InterfaceRepo {
    /// Upsert interface rows keyed by (device, name). Returns rows written.
    pub async fn upsert_all(pool: &Pool<Sqlite>, device_id: i64, records: &[InterfaceRecord]) -> Result<usize> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;
        for r in records {
            sqlx::query(
                r#"
                INSERT INTO device_interfaces
                    (device_id, name, admin_status, oper_status, speed, vlan, duplex, description, ip_address, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(device_id, name) DO UPDATE SET
                    admin_status = excluded.admin_status,
                    oper_status = excluded.oper_status,
                    speed = excluded.speed,
                    vlan = excluded.vlan,
                    duplex = excluded.duplex,
                    description = excluded.description,
                    ip_address = excluded.ip_address,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(device_id)
            .bind(&r.name)
            .bind(empty_if_none(r.admin_status.as_deref()))
            .bind(empty_if_none(r.oper_status.as_deref()))
            .bind(empty_if_none(r.speed.as_deref()))
            .bind(empty_if_none(r.vlan.as_deref()))
            .bind(empty_if_none(r.duplex.as_deref()))
            .bind(empty_if_none(r.description.as_deref()))
            .bind(empty_if_none(r.ip_address.as_deref()))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(records.len())
    }

    pub async fn list_by_device(pool: &Pool<Sqlite>, device_id: i64) -> Result<Vec<DeviceInterface>> {
        let rows = sqlx::query("SELECT * FROM device_interfaces WHERE device_id = ? ORDER BY name")
            .bind(device_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_interface_row).collect())
    }
}
