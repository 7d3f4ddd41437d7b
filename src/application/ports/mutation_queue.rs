use crate::domain::entities::{PurgeReport, QueueEntry, QueueEntryDraft};
use crate::domain::value_objects::QueueEntryId;
use crate::shared::error::AppError;
use async_trait::async_trait;

pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Append-only log of local mutations awaiting server confirmation.
#[async_trait]
pub trait MutationQueue: Send + Sync {
    async fn enqueue(&self, draft: QueueEntryDraft) -> Result<QueueEntryId, AppError>;
    /// Unsynced, non-rejected entries in insertion order.
    async fn list_pending(&self) -> Result<Vec<QueueEntry>, AppError>;
    async fn list_rejected(&self) -> Result<Vec<QueueEntry>, AppError>;
    /// Flip the entry to synced and remove it. Returns the confirmed entry, if it still existed.
    async fn mark_synced(&self, id: &QueueEntryId) -> Result<Option<QueueEntry>, AppError>;
    async fn record_failure(&self, id: &QueueEntryId, message: &str) -> Result<(), AppError>;
    async fn mark_rejected(&self, id: &QueueEntryId, message: &str) -> Result<(), AppError>;
    async fn discard(&self, id: &QueueEntryId) -> Result<bool, AppError>;
    async fn purge_stale(&self, max_age_days: i64) -> Result<PurgeReport, AppError>;
    /// Number of pending entries.
    async fn len(&self) -> Result<u64, AppError>;

    async fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.len().await? == 0)
    }
}
