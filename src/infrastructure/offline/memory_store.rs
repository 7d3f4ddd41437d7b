use crate::application::ports::local_store::LocalStore;
use crate::domain::entities::Record;
use crate::domain::value_objects::Collection;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryLocalStore {
    collections: RwLock<HashMap<Collection, BTreeMap<i64, Record>>>,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn get(&self, collection: Collection, id: i64) -> Result<Option<Record>, AppError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|records| records.get(&id))
            .cloned())
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<Record>, AppError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn put(&self, collection: Collection, record: Record) -> Result<(), AppError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection)
            .or_default()
            .insert(record.id, record);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: i64) -> Result<bool, AppError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(&collection)
            .and_then(|records| records.remove(&id))
            .is_some())
    }

    async fn bulk_put(
        &self,
        collection: Collection,
        records: Vec<Record>,
    ) -> Result<usize, AppError> {
        let count = records.len();
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection).or_default();
        for record in records {
            target.insert(record.id, record);
        }
        Ok(count)
    }

    async fn clear(&self, collection: Collection) -> Result<u64, AppError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .remove(&collection)
            .map(|records| records.len() as u64)
            .unwrap_or(0))
    }

    async fn count(&self, collection: Collection) -> Result<u64, AppError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|records| records.len() as u64)
            .unwrap_or(0))
    }

    fn is_durable(&self) -> bool {
        false
    }
}
