use super::mappers::{payload_to_json, queue_entry_from_row};
use super::rows::QueueEntryRow;
use crate::application::ports::mutation_queue::MutationQueue;
use crate::domain::entities::{PurgeReport, QueueEntry, QueueEntryDraft};
use crate::domain::value_objects::{QueueEntryId, QueueEntryStatus};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{Pool, Sqlite};

const ENTRY_COLUMNS: &str = "seq, id, mutation_type, entity, record_id, data, created_at, \
     synced, synced_at, status, attempts, last_error";

pub struct SqliteMutationQueue {
    pool: Pool<Sqlite>,
}

impl SqliteMutationQueue {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn list_by_status(&self, status: QueueEntryStatus) -> Result<Vec<QueueEntry>, AppError> {
        let rows = sqlx::query_as::<_, QueueEntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM pending_sync \
             WHERE synced = 0 AND status = ?1 \
             ORDER BY seq ASC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(queue_entry_from_row).collect()
    }
}

#[async_trait]
impl MutationQueue for SqliteMutationQueue {
    async fn enqueue(&self, draft: QueueEntryDraft) -> Result<QueueEntryId, AppError> {
        let id = QueueEntryId::generate();
        let data = payload_to_json(&draft.data)?;

        sqlx::query(
            r#"
            INSERT INTO pending_sync (
                id, mutation_type, entity, record_id, data,
                created_at, synced, status, attempts
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 'pending', 0)
            "#,
        )
        .bind(id.as_str())
        .bind(draft.mutation_type.as_str())
        .bind(draft.entity.as_str())
        .bind(draft.record_id)
        .bind(&data)
        .bind(draft.timestamp.timestamp_millis())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            target: "offline::queue",
            entry_id = %id,
            mutation = draft.mutation_type.as_str(),
            entity = draft.entity.as_str(),
            "mutation enqueued"
        );

        Ok(id)
    }

    async fn list_pending(&self) -> Result<Vec<QueueEntry>, AppError> {
        self.list_by_status(QueueEntryStatus::Pending).await
    }

    async fn list_rejected(&self) -> Result<Vec<QueueEntry>, AppError> {
        self.list_by_status(QueueEntryStatus::Rejected).await
    }

    async fn mark_synced(&self, id: &QueueEntryId) -> Result<Option<QueueEntry>, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, QueueEntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM pending_sync WHERE id = ?1"
        ))
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let synced_at = Utc::now().timestamp_millis();
        sqlx::query("UPDATE pending_sync SET synced = 1, synced_at = ?1 WHERE id = ?2")
            .bind(synced_at)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM pending_sync WHERE id = ?1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let mut entry = queue_entry_from_row(row)?;
        entry.synced = true;
        Ok(Some(entry))
    }

    async fn record_failure(&self, id: &QueueEntryId, message: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE pending_sync
            SET attempts = attempts + 1, last_error = ?1
            WHERE id = ?2
            "#,
        )
        .bind(message)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_rejected(&self, id: &QueueEntryId, message: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE pending_sync
            SET status = 'rejected', attempts = attempts + 1, last_error = ?1
            WHERE id = ?2
            "#,
        )
        .bind(message)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn discard(&self, id: &QueueEntryId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM pending_sync WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_stale(&self, max_age_days: i64) -> Result<PurgeReport, AppError> {
        // An age beyond chrono's range keeps everything.
        let cutoff = Duration::try_days(max_age_days.max(0))
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .map(|at| at.timestamp_millis())
            .unwrap_or(i64::MIN);
        let mut tx = self.pool.begin().await?;

        let synced = sqlx::query(
            r#"
            DELETE FROM pending_sync
            WHERE synced = 1 AND COALESCE(synced_at, created_at) < ?1
            "#,
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;

        let stale_ids: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM pending_sync
            WHERE synced = 0 AND created_at < ?1
            ORDER BY seq ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM pending_sync WHERE synced = 0 AND created_at < ?1")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let stale_discarded = stale_ids
            .into_iter()
            .map(|(id,)| QueueEntryId::new(id).map_err(AppError::ValidationError))
            .collect::<Result<Vec<_>, _>>()?;

        for id in &stale_discarded {
            tracing::warn!(
                target: "offline::queue",
                entry_id = %id,
                max_age_days,
                "unsynced mutation exceeded retention window and was discarded"
            );
        }

        Ok(PurgeReport {
            synced_removed: synced.rows_affected(),
            stale_discarded,
        })
    }

    async fn len(&self) -> Result<u64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pending_sync WHERE synced = 0 AND status = 'pending'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}
