use super::memory_store::InMemoryLocalStore;
use crate::application::ports::local_store::LocalStore;
use crate::domain::entities::Record;
use crate::domain::value_objects::Collection;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Durable store that drops to memory-only mode for the rest of the session
/// once the primary storage becomes unusable. Busy or failed statements are
/// returned to the caller unchanged.
pub struct FallbackLocalStore {
    primary: Arc<dyn LocalStore>,
    memory: InMemoryLocalStore,
    degraded: AtomicBool,
}

impl FallbackLocalStore {
    pub fn new(primary: Arc<dyn LocalStore>) -> Self {
        Self {
            primary,
            memory: InMemoryLocalStore::new(),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Returns `true` when the caller should retry against memory.
    fn absorb(&self, operation: &str, err: &AppError) -> bool {
        if !err.is_storage_failure() {
            return false;
        }
        if !self.degraded.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                target: "offline::store",
                operation,
                error = %err,
                "local store unavailable, continuing in memory-only mode"
            );
        }
        true
    }
}

#[async_trait]
impl LocalStore for FallbackLocalStore {
    async fn get(&self, collection: Collection, id: i64) -> Result<Option<Record>, AppError> {
        if !self.is_degraded() {
            match self.primary.get(collection, id).await {
                Err(err) if self.absorb("get", &err) => {}
                other => return other,
            }
        }
        self.memory.get(collection, id).await
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<Record>, AppError> {
        if !self.is_degraded() {
            match self.primary.get_all(collection).await {
                Err(err) if self.absorb("get_all", &err) => {}
                other => return other,
            }
        }
        self.memory.get_all(collection).await
    }

    async fn put(&self, collection: Collection, record: Record) -> Result<(), AppError> {
        if !self.is_degraded() {
            match self.primary.put(collection, record.clone()).await {
                Err(err) if self.absorb("put", &err) => {}
                other => return other,
            }
        }
        self.memory.put(collection, record).await
    }

    async fn delete(&self, collection: Collection, id: i64) -> Result<bool, AppError> {
        if !self.is_degraded() {
            match self.primary.delete(collection, id).await {
                Err(err) if self.absorb("delete", &err) => {}
                other => return other,
            }
        }
        self.memory.delete(collection, id).await
    }

    async fn bulk_put(
        &self,
        collection: Collection,
        records: Vec<Record>,
    ) -> Result<usize, AppError> {
        if !self.is_degraded() {
            match self.primary.bulk_put(collection, records.clone()).await {
                Err(err) if self.absorb("bulk_put", &err) => {}
                other => return other,
            }
        }
        self.memory.bulk_put(collection, records).await
    }

    async fn clear(&self, collection: Collection) -> Result<u64, AppError> {
        if !self.is_degraded() {
            match self.primary.clear(collection).await {
                Err(err) if self.absorb("clear", &err) => {}
                other => return other,
            }
        }
        self.memory.clear(collection).await
    }

    async fn count(&self, collection: Collection) -> Result<u64, AppError> {
        if !self.is_degraded() {
            match self.primary.count(collection).await {
                Err(err) if self.absorb("count", &err) => {}
                other => return other,
            }
        }
        self.memory.count(collection).await
    }

    fn is_durable(&self) -> bool {
        !self.is_degraded()
    }
}
