use crate::domain::entities::SyncStatusRecord;
use crate::domain::value_objects::Collection;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait SyncStatusStore: Send + Sync {
    async fn get_status(&self, collection: Collection)
    -> Result<Option<SyncStatusRecord>, AppError>;
    async fn list_statuses(&self) -> Result<Vec<SyncStatusRecord>, AppError>;
    async fn mark_pending(&self, collection: Collection) -> Result<(), AppError>;
    /// Record success. `pulled_at` advances `last_sync`; `None` keeps the current cursor.
    async fn record_success(
        &self,
        collection: Collection,
        pulled_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError>;
    /// Record a failure without moving `last_sync`.
    async fn record_error(&self, collection: Collection, message: &str) -> Result<(), AppError>;
}
