use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::models::*;

fn parse_json(text: Option<String>) -> Option<serde_json::Value> {
    text.and_then(|t| serde_json::from_str(&t).ok())
}

fn map_attempt_row(row: &SqliteRow) -> CollectionAttempt {
    let operations: String = row.get("operations");
    CollectionAttempt {
        id: row.get("id"),
        device_id: row.get("device_id"),
        operations: serde_json::from_str(&operations).unwrap_or_default(),
        status: row.get("status"),
        raw_output: parse_json(row.get("raw_output")),
        parsed_result: parse_json(row.get("parsed_result")),
        error: row.get("error"),
        created_at: row.get("created_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
    }
}

const SELECT_ATTEMPT: &str = r#"
    SELECT id, device_id, operations, status, raw_output, parsed_result, error,
           created_at, started_at, completed_at
    FROM collection_attempts
"#;

pub struct CollectionAttemptRepo;

impl CollectionAttemptRepo {
    pub async fn create(pool: &Pool<Sqlite>, id: &str, device_id: i64, operations: &[Operation]) -> Result<CollectionAttempt> {
        sqlx::query(
            r#"
            INSERT INTO collection_attempts (id, device_id, operations, status, created_at)
            VALUES (?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(id)
        .bind(device_id)
        .bind(serde_json::to_string(operations)?)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Self::get(pool, id)
            .await?
            .context("Collection attempt not found after creation")
    }

    pub async fn get(pool: &Pool<Sqlite>, id: &str) -> Result<Option<CollectionAttempt>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_ATTEMPT))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_attempt_row))
    }

    pub async fn update_started(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
        sqlx::query("UPDATE collection_attempts SET status = 'running', started_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_completed(
        pool: &Pool<Sqlite>,
        id: &str,
        raw_output: &serde_json::Value,
        parsed_result: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE collection_attempts SET status = 'completed', raw_output = ?, parsed_result = ?, completed_at = ? WHERE id = ?",
        )
        .bind(raw_output.to_string())
        .bind(parsed_result.to_string())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update_failed(pool: &Pool<Sqlite>, id: &str, error: &str) -> Result<()> {
        sqlx::query("UPDATE collection_attempts SET status = 'failed', error = ?, completed_at = ? WHERE id = ?")
            .bind(error)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn list_by_device(pool: &Pool<Sqlite>, device_id: i64, limit: i32) -> Result<Vec<CollectionAttempt>> {
        let rows = sqlx::query(&format!(
            "{} WHERE device_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
            SELECT_ATTEMPT
        ))
        .bind(device_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_attempt_row).collect())
    }

    /// Fail attempts left pending or running by a previous process
    pub async fn fail_stuck(pool: &Pool<Sqlite>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE collection_attempts SET status = 'failed', error = 'interrupted', completed_at = ? WHERE status IN ('pending', 'running')",
        )
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
