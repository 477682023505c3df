mod collection_attempts;
mod credentials;
mod devices;
mod interfaces;
mod links;
mod neighbors;
pub(crate) mod row_helpers;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::models::*;

pub(crate) use devices::DeviceRepo;
pub(crate) use links::{LinkRepo, NewLink};
pub(crate) use neighbors::NeighborRepo;

/// A referenced row does not exist. Mapped to 404 by the API layer.
#[derive(Debug)]
pub struct NotFoundError {
    pub resource: String,
    pub id: String,
}

impl NotFoundError {
    pub fn new(resource: &str, id: &str) -> Self {
        Self {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} not found: {}", self.resource, self.id)
    }
}

impl std::error::Error for NotFoundError {}

/// Request rejected because of the data it carries, not a storage failure
#[derive(Debug)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValidationError {}

/// Store handles all database operations, delegating to per-entity repo modules.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    pub async fn new(db_path: &str) -> Result<Self> {
        Self::with_pool_size(db_path, 5).await
    }

    /// Create a new database store with a specific pool size
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database. A single connection that never expires,
    /// since each SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Mark attempts a previous process left pending/running as failed
    pub async fn recover_interrupted_attempts(&self) -> Result<u64> {
        collection_attempts::CollectionAttemptRepo::fail_stuck(&self.pool).await
    }

    // ========== Device Operations ==========

    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        DeviceRepo::list(&self.pool).await
    }

    pub async fn get_device(&self, id: i64) -> Result<Option<Device>> {
        DeviceRepo::get(&self.pool, id).await
    }

    pub async fn create_device(&self, req: &CreateDeviceRequest) -> Result<Device> {
        if req.ip.trim().is_empty() {
            return Err(ValidationError("Device ip is required".to_string()).into());
        }
        DeviceRepo::create(&self.pool, req).await
    }

    pub async fn delete_device(&self, id: i64) -> Result<()> {
        DeviceRepo::delete(&self.pool, id).await
    }

    pub async fn mark_device_online(&self, id: i64) -> Result<()> {
        DeviceRepo::mark_online(&self.pool, id).await
    }

    pub async fn update_device_error(&self, id: i64, error_msg: &str) -> Result<()> {
        DeviceRepo::set_error(&self.pool, id, error_msg).await
    }

    pub async fn update_device_identity(&self, id: i64, info: &SystemInfo) -> Result<()> {
        DeviceRepo::update_identity(&self.pool, id, info).await
    }

    // ========== Credential Operations ==========

    pub async fn list_credentials(&self) -> Result<Vec<Credential>> {
        credentials::CredentialRepo::list(&self.pool).await
    }

    pub async fn get_credential(&self, id: i64) -> Result<Option<Credential>> {
        credentials::CredentialRepo::get(&self.pool, id).await
    }

    pub async fn create_credential(&self, req: &CreateCredentialRequest) -> Result<Credential> {
        credentials::CredentialRepo::create(&self.pool, req).await
    }

    pub async fn delete_credential(&self, id: i64) -> Result<()> {
        credentials::CredentialRepo::delete(&self.pool, id).await
    }

    // ========== Interface Operations ==========

    pub async fn upsert_interfaces(&self, device_id: i64, records: &[InterfaceRecord]) -> Result<usize> {
        interfaces::InterfaceRepo::upsert_all(&self.pool, device_id, records).await
    }

    pub async fn list_interfaces(&self, device_id: i64) -> Result<Vec<DeviceInterface>> {
        interfaces::InterfaceRepo::list_by_device(&self.pool, device_id).await
    }

    // ========== Neighbor Operations ==========

    pub async fn list_neighbors(&self, device_id: i64) -> Result<Vec<Neighbor>> {
        NeighborRepo::list_by_device(&self.pool, device_id).await
    }

    // ========== Link Operations ==========

    pub async fn list_links(&self) -> Result<Vec<Link>> {
        LinkRepo::list(&self.pool).await
    }

    /// Register a link by hand. The pair must be two distinct known devices
    /// with no link yet in either direction.
    pub async fn create_link(&self, req: &CreateLinkRequest) -> Result<Link> {
        if req.source_device_id == req.target_device_id {
            return Err(ValidationError("A link needs two distinct devices".to_string()).into());
        }

        let mut tx = self.pool.begin().await?;
        for id in [req.source_device_id, req.target_device_id] {
            if !DeviceRepo::exists(&mut tx, id).await? {
                return Err(NotFoundError::new("Device", &id.to_string()).into());
            }
        }
        if let Some(existing) = LinkRepo::find_between(&mut tx, req.source_device_id, req.target_device_id).await? {
            return Err(ValidationError(format!(
                "Devices {} and {} are already linked (link {})",
                req.source_device_id, req.target_device_id, existing.id
            ))
            .into());
        }

        let link = LinkRepo::create(
            &mut tx,
            &NewLink {
                source_device_id: req.source_device_id,
                target_device_id: req.target_device_id,
                source_interface: req.source_interface.as_deref(),
                target_interface: req.target_interface.as_deref(),
                link_type: &req.link_type,
                bandwidth: req.bandwidth,
            },
            Utc::now(),
        )
        .await?;
        tx.commit().await?;
        Ok(link)
    }

    pub async fn delete_link(&self, id: i64) -> Result<()> {
        LinkRepo::delete(&self.pool, id).await
    }

    // ========== Collection Attempt Operations ==========

    pub async fn create_attempt(&self, id: &str, device_id: i64, operations: &[Operation]) -> Result<CollectionAttempt> {
        collection_attempts::CollectionAttemptRepo::create(&self.pool, id, device_id, operations).await
    }

    pub async fn get_attempt(&self, id: &str) -> Result<Option<CollectionAttempt>> {
        collection_attempts::CollectionAttemptRepo::get(&self.pool, id).await
    }

    pub async fn update_attempt_started(&self, id: &str) -> Result<()> {
        collection_attempts::CollectionAttemptRepo::update_started(&self.pool, id).await
    }

    pub async fn update_attempt_completed(
        &self,
        id: &str,
        raw_output: &serde_json::Value,
        parsed_result: &serde_json::Value,
    ) -> Result<()> {
        collection_attempts::CollectionAttemptRepo::update_completed(&self.pool, id, raw_output, parsed_result).await
    }

    pub async fn update_attempt_failed(&self, id: &str, error: &str) -> Result<()> {
        collection_attempts::CollectionAttemptRepo::update_failed(&self.pool, id, error).await
    }

    pub async fn list_attempts(&self, device_id: i64, limit: i32) -> Result<Vec<CollectionAttempt>> {
        collection_attempts::CollectionAttemptRepo::list_by_device(&self.pool, device_id, limit).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub async fn store() -> Store {
        Store::in_memory().await.unwrap()
    }

    pub async fn device(store: &Store, name: &str, ip: &str, vendor: &str) -> Device {
        store
            .create_device(&CreateDeviceRequest {
                name: name.to_string(),
                hostname: String::new(),
                ip: ip.to_string(),
                vendor: vendor.to_string(),
                ssh_port: None,
                credential_id: None,
            })
            .await
            .unwrap()
    }
}
