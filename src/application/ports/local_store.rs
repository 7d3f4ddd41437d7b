use crate::domain::entities::Record;
use crate::domain::value_objects::Collection;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Persistent record collections (patients, visits, prescriptions, lab results).
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, collection: Collection, id: i64) -> Result<Option<Record>, AppError>;
    async fn get_all(&self, collection: Collection) -> Result<Vec<Record>, AppError>;
    /// Upsert by id. Last write wins.
    async fn put(&self, collection: Collection, record: Record) -> Result<(), AppError>;
    async fn delete(&self, collection: Collection, id: i64) -> Result<bool, AppError>;
    /// Write a batch as one unit of work; a failure rejects the whole batch.
    async fn bulk_put(&self, collection: Collection, records: Vec<Record>)
    -> Result<usize, AppError>;
    async fn clear(&self, collection: Collection) -> Result<u64, AppError>;
    async fn count(&self, collection: Collection) -> Result<u64, AppError>;

    /// Whether writes survive a restart.
    fn is_durable(&self) -> bool {
        true
    }
}
