use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::sync::Arc;

#[derive(Clone)]
pub struct ConnectionPool {
    pool: Arc<SqlitePool>,
}

impl ConnectionPool {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Single-connection in-memory database. The connection is never recycled,
    /// otherwise the database would vanish with it.
    pub async fn from_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_creates_offline_tables() {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table' AND name IN ('records', 'pending_sync', 'sync_status')
            ORDER BY name
            "#,
        )
        .fetch_all(pool.get_pool())
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|(name,)| name.as_str()).collect();
        assert_eq!(names, vec!["pending_sync", "records", "sync_status"]);
    }

    #[tokio::test]
    async fn file_backed_database_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite:{}?mode=rwc",
            dir.path().join("clinic.db").display()
        );

        let pool = ConnectionPool::new(&url, 2).await.unwrap();
        pool.migrate().await.unwrap();
        sqlx::query(
            "INSERT INTO records (collection, id, data, updated_at) \
             VALUES ('patients', 1, '{}', 0)",
        )
        .execute(pool.get_pool())
        .await
        .unwrap();
        pool.close().await;

        let reopened = ConnectionPool::new(&url, 2).await.unwrap();
        reopened.migrate().await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records")
            .fetch_one(reopened.get_pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
