use crate::application::ports::{LocalStore, MutationQueue};
use crate::domain::entities::{QueueEntry, QueueEntryDraft, Record, SavedMutation};
use crate::domain::value_objects::{Collection, MutationType, QueueEntryId, RecordPayload};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

#[async_trait]
pub trait OfflineServiceTrait: Send + Sync {
    async fn create(&self, entity: Collection, data: Value) -> Result<SavedMutation, AppError>;
    async fn update(
        &self,
        entity: Collection,
        id: i64,
        data: Value,
    ) -> Result<SavedMutation, AppError>;
    /// Returns the queued delete, or `None` when the record never reached the server.
    async fn delete(&self, entity: Collection, id: i64) -> Result<Option<QueueEntryId>, AppError>;
    async fn get(&self, entity: Collection, id: i64) -> Result<Option<Record>, AppError>;
    async fn list(&self, entity: Collection) -> Result<Vec<Record>, AppError>;
    /// Queue a raw mutation without touching the local store.
    async fn enqueue(
        &self,
        mutation_type: MutationType,
        entity: &str,
        data: Value,
    ) -> Result<QueueEntryId, AppError>;
}

/// UI write path: every change lands in the local store first, then in the queue.
pub struct OfflineService {
    store: Arc<dyn LocalStore>,
    queue: Arc<dyn MutationQueue>,
    last_provisional: AtomicI64,
}

impl OfflineService {
    pub fn new(store: Arc<dyn LocalStore>, queue: Arc<dyn MutationQueue>) -> Self {
        Self {
            store,
            queue,
            last_provisional: AtomicI64::new(0),
        }
    }

    fn object_payload(data: Value) -> Result<RecordPayload, AppError> {
        if !data.is_object() {
            return Err(AppError::ValidationError(
                "Record data must be a JSON object".to_string(),
            ));
        }
        RecordPayload::new(data).map_err(AppError::ValidationError)
    }

    /// Negative, unique across restarts (seeded from the clock) and strictly
    /// decreasing within a process.
    fn next_provisional_id(&self) -> i64 {
        let candidate = -Utc::now().timestamp_micros();
        let mut current = self.last_provisional.load(Ordering::SeqCst);
        loop {
            let next = candidate.min(current - 1);
            match self.last_provisional.compare_exchange(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Drop queued creates for a record that only exists locally.
    async fn discard_unsent_creates(&self, entity: Collection, id: i64) -> Result<usize, AppError> {
        let mut candidates: Vec<QueueEntry> = self.queue.list_pending().await?;
        candidates.extend(self.queue.list_rejected().await?);

        let mut discarded = 0;
        for entry in candidates.iter().filter(|entry| {
            entry.mutation_type == MutationType::Create
                && entry.entity == entity
                && entry.record_id == Some(id)
        }) {
            if self.queue.discard(&entry.id).await? {
                discarded += 1;
            }
        }
        Ok(discarded)
    }

    async fn save_create(
        &self,
        entity: Collection,
        record_id: i64,
        payload: RecordPayload,
    ) -> Result<SavedMutation, AppError> {
        let body = if record_id < 0 {
            payload.clone().without_id()
        } else {
            payload.clone()
        };

        self.store
            .put(entity, Record::new(record_id, payload.with_id(record_id)))
            .await?;
        let entry_id = self
            .queue
            .enqueue(
                QueueEntryDraft::new(MutationType::Create, entity, body).with_record_id(record_id),
            )
            .await?;

        Ok(SavedMutation {
            entity,
            record_id,
            entry_id,
        })
    }
}

#[async_trait]
impl OfflineServiceTrait for OfflineService {
    async fn create(&self, entity: Collection, data: Value) -> Result<SavedMutation, AppError> {
        let payload = Self::object_payload(data)?;
        let record_id = match payload.numeric_id() {
            Some(id) => id,
            None => self.next_provisional_id(),
        };
        self.save_create(entity, record_id, payload).await
    }

    async fn update(
        &self,
        entity: Collection,
        id: i64,
        data: Value,
    ) -> Result<SavedMutation, AppError> {
        let payload = Self::object_payload(data)?.with_id(id);

        if id < 0 {
            // Never reached the server: fold the edit into a fresh create.
            let folded = self.discard_unsent_creates(entity, id).await?;
            tracing::debug!(
                target: "offline::queue",
                entity = %entity,
                record_id = id,
                folded,
                "update of provisional record re-queued as create"
            );
            return self.save_create(entity, id, payload).await;
        }

        self.store
            .put(entity, Record::new(id, payload.clone()))
            .await?;
        let entry_id = self
            .queue
            .enqueue(
                QueueEntryDraft::new(MutationType::Update, entity, payload).with_record_id(id),
            )
            .await?;

        Ok(SavedMutation {
            entity,
            record_id: id,
            entry_id,
        })
    }

    async fn delete(&self, entity: Collection, id: i64) -> Result<Option<QueueEntryId>, AppError> {
        self.store.delete(entity, id).await?;

        if id < 0 {
            let discarded = self.discard_unsent_creates(entity, id).await?;
            tracing::debug!(
                target: "offline::queue",
                entity = %entity,
                record_id = id,
                discarded,
                "deleted provisional record before it was sent"
            );
            return Ok(None);
        }

        let payload = RecordPayload::new(serde_json::json!({ "id": id }))
            .map_err(AppError::ValidationError)?;
        let entry_id = self
            .queue
            .enqueue(
                QueueEntryDraft::new(MutationType::Delete, entity, payload).with_record_id(id),
            )
            .await?;
        Ok(Some(entry_id))
    }

    async fn get(&self, entity: Collection, id: i64) -> Result<Option<Record>, AppError> {
        self.store.get(entity, id).await
    }

    async fn list(&self, entity: Collection) -> Result<Vec<Record>, AppError> {
        self.store.get_all(entity).await
    }

    async fn enqueue(
        &self,
        mutation_type: MutationType,
        entity: &str,
        data: Value,
    ) -> Result<QueueEntryId, AppError> {
        let entity = Collection::parse(entity).map_err(AppError::ValidationError)?;
        let payload = RecordPayload::new(data).map_err(AppError::ValidationError)?;
        self.queue
            .enqueue(QueueEntryDraft::new(mutation_type, entity, payload))
            .await
    }
}
