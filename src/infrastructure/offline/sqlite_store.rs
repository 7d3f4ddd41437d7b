use super::locks::CollectionLocks;
use super::mappers::{payload_to_json, record_from_row};
use super::rows::RecordRow;
use crate::application::ports::local_store::LocalStore;
use crate::domain::entities::Record;
use crate::domain::value_objects::Collection;
use crate::shared::error::AppError;
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

pub struct SqliteLocalStore {
    pool: Pool<Sqlite>,
    locks: CollectionLocks,
}

impl SqliteLocalStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            locks: CollectionLocks::new(),
        }
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn get(&self, collection: Collection, id: i64) -> Result<Option<Record>, AppError> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, data, updated_at FROM records
            WHERE collection = ?1 AND id = ?2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(record_from_row).transpose()
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<Record>, AppError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, data, updated_at FROM records
            WHERE collection = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }

    async fn put(&self, collection: Collection, record: Record) -> Result<(), AppError> {
        let data = payload_to_json(&record.data)?;
        let _guard = self.locks.lock(collection).await;

        sqlx::query(
            r#"
            INSERT INTO records (collection, id, data, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(collection, id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection.as_str())
        .bind(record.id)
        .bind(&data)
        .bind(record.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, collection: Collection, id: i64) -> Result<bool, AppError> {
        let _guard = self.locks.lock(collection).await;

        let result = sqlx::query("DELETE FROM records WHERE collection = ?1 AND id = ?2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn bulk_put(
        &self,
        collection: Collection,
        records: Vec<Record>,
    ) -> Result<usize, AppError> {
        if records.is_empty() {
            return Ok(0);
        }

        let encoded = records
            .iter()
            .map(|record| {
                payload_to_json(&record.data)
                    .map(|data| (record.id, data, record.updated_at.timestamp_millis()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let _guard = self.locks.lock(collection).await;
        let mut tx = self.pool.begin().await?;

        for (id, data, updated_at) in &encoded {
            sqlx::query(
                r#"
                INSERT INTO records (collection, id, data, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(collection, id) DO UPDATE SET
                    data = excluded.data,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(collection.as_str())
            .bind(id)
            .bind(data)
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            target: "offline::store",
            collection = collection.as_str(),
            count = encoded.len(),
            "bulk write committed"
        );

        Ok(encoded.len())
    }

    async fn clear(&self, collection: Collection) -> Result<u64, AppError> {
        let _guard = self.locks.lock(collection).await;

        let result = sqlx::query("DELETE FROM records WHERE collection = ?1")
            .bind(collection.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count(&self, collection: Collection) -> Result<u64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records WHERE collection = ?1")
            .bind(collection.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}
