use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::models::*;
use super::row_helpers::{empty_if_none, map_link_row};

const SELECT_LINK: &str = r#"
    SELECT id, source_device_id, target_device_id, source_interface, target_interface,
           link_type, status, bandwidth, created_at, updated_at
    FROM links
"#;

/// Fields of a link to insert
pub struct NewLink<'a> {
    pub source_device_id: i64,
    pub target_device_id: i64,
    pub source_interface: Option<&'a str>,
    pub target_interface: Option<&'a str>,
    pub link_type: &'a str,
    pub bandwidth: Option<i64>,
}

pub struct LinkRepo;

impl LinkRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<Link>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_LINK))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_link_row).collect())
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Link>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_LINK))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_link_row))
    }

    /// The link between two devices, stored in either direction
    pub async fn find_between(conn: &mut SqliteConnection, a: i64, b: i64) -> Result<Option<Link>> {
        let row = sqlx::query(&format!(
            "{} WHERE (source_device_id = ? AND target_device_id = ?) OR (source_device_id = ? AND target_device_id = ?)",
            SELECT_LINK
        ))
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.as_ref().map(map_link_row))
    }

    pub async fn create(conn: &mut SqliteConnection, link: &NewLink<'_>, now: DateTime<Utc>) -> Result<Link> {
        let result = sqlx::query(
            r#"
            INSERT INTO links
                (source_device_id, target_device_id, source_interface, target_interface,
                 link_type, status, bandwidth, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'up', ?, ?, ?)
            "#,
        )
        .bind(link.source_device_id)
        .bind(link.target_device_id)
        .bind(empty_if_none(link.source_interface))
        .bind(empty_if_none(link.target_interface))
        .bind(link.link_type)
        .bind(link.bandwidth)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("Link not found after creation")
    }

    /// Mark a link up and, when known, record the interface on the side
    /// belonging to `device_id`. Link type and device pair are unchanged.
    pub async fn refresh_side(
        conn: &mut SqliteConnection,
        link: &Link,
        device_id: i64,
        interface: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let column = if link.source_device_id == device_id {
            "source_interface"
        } else {
            "target_interface"
        };
        sqlx::query(&format!(
            "UPDATE links SET {col} = COALESCE(NULLIF(?, ''), {col}), status = 'up', updated_at = ? WHERE id = ?",
            col = column
        ))
        .bind(empty_if_none(interface))
        .bind(now)
        .bind(link.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM links WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(super::NotFoundError::new("Link", &id.to_string()).into());
        }
        Ok(())
    }
}
