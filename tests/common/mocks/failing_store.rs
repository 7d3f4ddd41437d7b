use async_trait::async_trait;
use clinic_sync::application::ports::LocalStore;
use clinic_sync::domain::entities::Record;
use clinic_sync::domain::value_objects::Collection;
use clinic_sync::shared::error::AppError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Local store whose every call fails: by default because the backing storage
/// is gone, or with a busy database when built with `locked()`.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct FailingLocalStore {
    calls: Arc<AtomicUsize>,
    busy: bool,
}

#[allow(dead_code)]
impl FailingLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locked() -> Self {
        Self {
            busy: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.busy {
            Err(AppError::Database("database is locked".to_string()))
        } else {
            Err(AppError::Storage("quota exceeded".to_string()))
        }
    }
}

#[async_trait]
impl LocalStore for FailingLocalStore {
    async fn get(&self, _collection: Collection, _id: i64) -> Result<Option<Record>, AppError> {
        self.fail()
    }

    async fn get_all(&self, _collection: Collection) -> Result<Vec<Record>, AppError> {
        self.fail()
    }

    async fn put(&self, _collection: Collection, _record: Record) -> Result<(), AppError> {
        self.fail()
    }

    async fn delete(&self, _collection: Collection, _id: i64) -> Result<bool, AppError> {
        self.fail()
    }

    async fn bulk_put(
        &self,
        _collection: Collection,
        _records: Vec<Record>,
    ) -> Result<usize, AppError> {
        self.fail()
    }

    async fn clear(&self, _collection: Collection) -> Result<u64, AppError> {
        self.fail()
    }

    async fn count(&self, _collection: Collection) -> Result<u64, AppError> {
        self.fail()
    }
}
