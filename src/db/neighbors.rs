use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite, SqliteConnection};

use crate::models::*;
use super::row_helpers::{empty_if_none, map_neighbor_row};

const SELECT_NEIGHBOR: &str = r#"
    SELECT id, device_id, local_interface, protocol, remote_device_name, remote_interface,
           remote_ip, remote_device_id, raw_data, discovered_at, last_updated
    FROM neighbors
"#;

pub struct NeighborRepo;

impl NeighborRepo {
    /// Insert or refresh the row for (device, local interface, protocol).
    /// `discovered_at` is only written on first insert. Returns the row id.
    pub async fn upsert(
        conn: &mut SqliteConnection,
        device_id: i64,
        obs: &NeighborObservation,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO neighbors
                (device_id, local_interface, protocol, remote_device_name, remote_interface,
                 remote_ip, raw_data, discovered_at, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(device_id, local_interface, protocol) DO UPDATE SET
                remote_device_name = excluded.remote_device_name,
                remote_interface = excluded.remote_interface,
                remote_ip = excluded.remote_ip,
                raw_data = excluded.raw_data,
                last_updated = excluded.last_updated
            RETURNING id
            "#,
        )
        .bind(device_id)
        .bind(&obs.local_interface)
        .bind(obs.protocol.as_str())
        .bind(&obs.remote_device_name)
        .bind(empty_if_none(obs.remote_interface.as_deref()))
        .bind(empty_if_none(obs.remote_ip.as_deref()))
        .bind(&obs.raw_data)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to upsert neighbor")?;
        Ok(row.get("id"))
    }

    /// Write the resolution result back; `None` clears a stale reference
    pub async fn set_remote_device(conn: &mut SqliteConnection, id: i64, remote_device_id: Option<i64>) -> Result<()> {
        sqlx::query("UPDATE neighbors SET remote_device_id = ? WHERE id = ?")
            .bind(remote_device_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn list_by_device(pool: &Pool<Sqlite>, device_id: i64) -> Result<Vec<Neighbor>> {
        let rows = sqlx::query(&format!(
            "{} WHERE device_id = ? ORDER BY protocol, local_interface",
            SELECT_NEIGHBOR
        ))
        .bind(device_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().filter_map(map_neighbor_row).collect())
    }

    /// Every neighbor with a resolved remote device, oldest first
    pub async fn list_resolved(conn: &mut SqliteConnection) -> Result<Vec<Neighbor>> {
        let rows = sqlx::query(&format!(
            "{} WHERE remote_device_id IS NOT NULL ORDER BY id",
            SELECT_NEIGHBOR
        ))
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.iter().filter_map(map_neighbor_row).collect())
    }
}
