use crate::db::models::camera_models::Camera;
use crate::error::Error;
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// Cameras repository for handling camera operations
#[derive(Clone)]
pub struct CamerasRepository {
    pool: Arc<PgPool>,
}

impl CamerasRepository {
    /// Create a new cameras repository
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Register a new camera
    pub async fn insert(
        &self,
        serial: &str,
        interface_type: &str,
        connected: bool,
    ) -> Result<Camera> {
        info!("Registering camera: {}", serial);

        let result = sqlx::query_as::<_, Camera>(
            r#"
            INSERT INTO cameras (serial, interface_type, connected, last_updated)
            VALUES ($1, $2, $3, LOCALTIMESTAMP)
            RETURNING id, serial, interface_type, connected, last_updated
            "#,
        )
        .bind(serial)
        .bind(interface_type)
        .bind(connected)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to register camera: {}", e)))?;

        Ok(result)
    }

    /// Get camera by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Camera>> {
        let result = sqlx::query_as::<_, Camera>(
            r#"
            SELECT id, serial, interface_type, connected, last_updated
            FROM cameras
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to get camera by ID: {}", e)))?;

        Ok(result)
    }

    /// Get all cameras
    pub async fn get_all(&self) -> Result<Vec<Camera>> {
        let result = sqlx::query_as::<_, Camera>(
            r#"
            SELECT id, serial, interface_type, connected, last_updated
            FROM cameras
            ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to get cameras: {}", e)))?;

        Ok(result)
    }

    /// Get the first registered camera, the dashboard's primary device
    pub async fn get_first(&self) -> Result<Option<Camera>> {
        let result = sqlx::query_as::<_, Camera>(
            r#"
            SELECT id, serial, interface_type, connected, last_updated
            FROM cameras
            ORDER BY id
            LIMIT 1
            "#,
        )
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to get first camera: {}", e)))?;

        Ok(result)
    }

    /// Update the connected flag, refreshing last_updated
    pub async fn set_connected(&self, id: i64, connected: bool) -> Result<Option<Camera>> {
        let result = sqlx::query_as::<_, Camera>(
            r#"
            UPDATE cameras
            SET connected = $2, last_updated = LOCALTIMESTAMP
            WHERE id = $1
            RETURNING id, serial, interface_type, connected, last_updated
            "#,
        )
        .bind(id)
        .bind(connected)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to update camera status: {}", e)))?;

        Ok(result)
    }

    /// Update a camera's fields, refreshing last_updated
    pub async fn update(
        &self,
        id: i64,
        serial: &str,
        interface_type: &str,
        connected: bool,
    ) -> Result<Option<Camera>> {
        let result = sqlx::query_as::<_, Camera>(
            r#"
            UPDATE cameras
            SET serial = $2, interface_type = $3, connected = $4, last_updated = LOCALTIMESTAMP
            WHERE id = $1
            RETURNING id, serial, interface_type, connected, last_updated
            "#,
        )
        .bind(id)
        .bind(serial)
        .bind(interface_type)
        .bind(connected)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::StorageUnavailable(format!("Failed to update camera: {}", e)))?;

        Ok(result)
    }

    /// Count all cameras
    pub async fn count_total(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cameras")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("Failed to count cameras: {}", e)))?;

        Ok(count)
    }

    /// Count cameras by connection state
    pub async fn count_by_connected(&self, connected: bool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cameras WHERE connected = $1")
            .bind(connected)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("Failed to count cameras by status: {}", e)))?;

        Ok(count)
    }

    /// Delete a camera
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cameras WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::StorageUnavailable(format!("Failed to delete camera: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
