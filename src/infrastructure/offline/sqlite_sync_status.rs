use super::mappers::sync_status_from_row;
use super::rows::SyncStatusRow;
use crate::application::ports::sync_status_store::SyncStatusStore;
use crate::domain::entities::SyncStatusRecord;
use crate::domain::value_objects::Collection;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

pub struct SqliteSyncStatusStore {
    pool: Pool<Sqlite>,
}

impl SqliteSyncStatusStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncStatusStore for SqliteSyncStatusStore {
    async fn get_status(
        &self,
        collection: Collection,
    ) -> Result<Option<SyncStatusRecord>, AppError> {
        let row = sqlx::query_as::<_, SyncStatusRow>(
            r#"
            SELECT entity_type, last_sync, status, last_error, updated_at
            FROM sync_status
            WHERE entity_type = ?1
            "#,
        )
        .bind(collection.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(sync_status_from_row).transpose()
    }

    async fn list_statuses(&self) -> Result<Vec<SyncStatusRecord>, AppError> {
        let rows = sqlx::query_as::<_, SyncStatusRow>(
            r#"
            SELECT entity_type, last_sync, status, last_error, updated_at
            FROM sync_status
            ORDER BY entity_type ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(sync_status_from_row).collect()
    }

    async fn mark_pending(&self, collection: Collection) -> Result<(), AppError> {
        let now = Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO sync_status (entity_type, last_sync, status, last_error, updated_at)
            VALUES (?1, NULL, 'pending', NULL, ?2)
            ON CONFLICT(entity_type) DO UPDATE SET
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_success(
        &self,
        collection: Collection,
        pulled_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        let now = Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO sync_status (entity_type, last_sync, status, last_error, updated_at)
            VALUES (?1, ?2, 'success', NULL, ?3)
            ON CONFLICT(entity_type) DO UPDATE SET
                last_sync = COALESCE(excluded.last_sync, sync_status.last_sync),
                status = excluded.status,
                last_error = NULL,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection.as_str())
        .bind(pulled_at.map(|at| at.timestamp_millis()))
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_error(&self, collection: Collection, message: &str) -> Result<(), AppError> {
        let now = Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO sync_status (entity_type, last_sync, status, last_error, updated_at)
            VALUES (?1, NULL, 'error', ?2, ?3)
            ON CONFLICT(entity_type) DO UPDATE SET
                status = excluded.status,
                last_error = excluded.last_error,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection.as_str())
        .bind(message)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
