use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, SqliteConnection};

use crate::models::*;
use super::row_helpers::map_device_row;

const SELECT_DEVICE: &str = r#"
    SELECT id, name, hostname, ip, vendor, ssh_port, credential_id, status,
           model, serial_number, software_version, uptime, last_seen, last_error,
           created_at, updated_at
    FROM devices
"#;

pub struct DeviceRepo;

impl DeviceRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_DEVICE))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_device_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Device>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_DEVICE))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_device_row))
    }

    pub async fn create(pool: &Pool<Sqlite>, req: &CreateDeviceRequest) -> Result<Device> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO devices (name, hostname, ip, vendor, ssh_port, credential_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&req.name)
        .bind(&req.hostname)
        .bind(&req.ip)
        .bind(req.vendor.trim().to_lowercase())
        .bind(req.ssh_port.unwrap_or(22))
        .bind(req.credential_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Self::get(pool, result.last_insert_rowid())
            .await?
            .context("Device not found after creation")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Device", &id.to_string()).into());
        }
        Ok(())
    }

    pub async fn exists(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM devices WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.is_some())
    }

    /// Successful contact: online, seen now, error cleared
    pub async fn mark_online(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE devices SET status = 'online', last_seen = ?, last_error = '', updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_error(pool: &Pool<Sqlite>, id: i64, error_msg: &str) -> Result<()> {
        sqlx::query("UPDATE devices SET status = 'error', last_error = ?, updated_at = ? WHERE id = ?")
            .bind(error_msg)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Overwrite identity columns the device reported; absent fields keep
    /// their stored value
    pub async fn update_identity(pool: &Pool<Sqlite>, id: i64, info: &SystemInfo) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE devices SET
                hostname = COALESCE(?, hostname),
                model = COALESCE(?, model),
                serial_number = COALESCE(?, serial_number),
                software_version = COALESCE(?, software_version),
                uptime = COALESCE(?, uptime),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&info.hostname)
        .bind(&info.model)
        .bind(&info.serial_number)
        .bind(&info.software_version)
        .bind(&info.uptime)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Devices whose name or hostname equals `name`, case-insensitively,
    /// lowest id first
    pub async fn ids_by_exact_name(conn: &mut SqliteConnection, name: &str, exclude_id: i64) -> Result<Vec<i64>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM devices
            WHERE id != ?
              AND ((name != '' AND lower(name) = lower(?)) OR (hostname != '' AND lower(hostname) = lower(?)))
            ORDER BY id
            "#,
        )
        .bind(exclude_id)
        .bind(name)
        .bind(name)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    /// Devices whose name or hostname contains `fragment`,
    /// case-insensitively, lowest id first
    pub async fn ids_by_name_fragment(conn: &mut SqliteConnection, fragment: &str, exclude_id: i64) -> Result<Vec<i64>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM devices
            WHERE id != ?
              AND (instr(lower(name), lower(?)) > 0 OR instr(lower(hostname), lower(?)) > 0)
            ORDER BY id
            "#,
        )
        .bind(exclude_id)
        .bind(fragment)
        .bind(fragment)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    pub async fn ids_by_ip(conn: &mut SqliteConnection, ip: &str, exclude_id: i64) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT id FROM devices WHERE id != ? AND ip = ? ORDER BY id")
            .bind(exclude_id)
            .bind(ip)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(|r| r.get("id")).collect())
    }
}
