use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clinic_sync::application::ports::LocalStore;
use clinic_sync::application::services::{
    Connectivity, OfflineService, SyncEvent, SyncManager,
};
use clinic_sync::domain::entities::SyncReport;
use clinic_sync::infrastructure::database::ConnectionPool;
use clinic_sync::infrastructure::offline::{
    SqliteLocalStore, SqliteMutationQueue, SqliteSyncStatusStore,
};
use clinic_sync::shared::config::SyncConfig;
use tokio::sync::broadcast;

use super::mocks::MockRemoteApi;

#[allow(dead_code)]
pub struct SyncTestContext {
    pub pool: ConnectionPool,
    pub store: Arc<SqliteLocalStore>,
    pub queue: Arc<SqliteMutationQueue>,
    pub statuses: Arc<SqliteSyncStatusStore>,
    pub remote: MockRemoteApi,
    pub connectivity: Connectivity,
    pub manager: Arc<SyncManager>,
    pub service: OfflineService,
}

/// Interval long enough that the timer never fires during a test, and no
/// background pulls.
#[allow(dead_code)]
pub fn quiet_config() -> SyncConfig {
    SyncConfig {
        sync_interval: 3600,
        refresh_interval: 0,
        ..SyncConfig::default()
    }
}

#[allow(dead_code)]
pub async fn setup_sync(online: bool) -> SyncTestContext {
    setup_sync_with(quiet_config(), online).await
}

#[allow(dead_code)]
pub async fn setup_sync_with(config: SyncConfig, online: bool) -> SyncTestContext {
    let pool = ConnectionPool::from_memory().await.expect("in-memory sqlite");
    pool.migrate().await.expect("migrations");

    let store = Arc::new(SqliteLocalStore::new(pool.get_pool().clone()));
    let queue = Arc::new(SqliteMutationQueue::new(pool.get_pool().clone()));
    let statuses = Arc::new(SqliteSyncStatusStore::new(pool.get_pool().clone()));
    let remote = MockRemoteApi::new();
    let connectivity = Connectivity::new(online);

    let manager = SyncManager::new(
        store.clone(),
        queue.clone(),
        statuses.clone(),
        Arc::new(remote.clone()),
        connectivity.clone(),
        config,
    );
    let local_store: Arc<dyn LocalStore> = store.clone();
    let service = OfflineService::new(local_store, queue.clone());

    SyncTestContext {
        pool,
        store,
        queue,
        statuses,
        remote,
        connectivity,
        manager,
        service,
    }
}

/// Rewrite an entry's creation time, as if it had been queued long ago.
#[allow(dead_code)]
pub async fn backdate_entry(pool: &ConnectionPool, entry_id: &str, created_at: DateTime<Utc>) {
    sqlx::query("UPDATE pending_sync SET created_at = ?1 WHERE id = ?2")
        .bind(created_at.timestamp_millis())
        .bind(entry_id)
        .execute(pool.get_pool())
        .await
        .expect("backdate entry");
}

/// Wait for the next completed pass, skipping other events.
#[allow(dead_code)]
pub async fn next_report(events: &mut broadcast::Receiver<SyncEvent>) -> SyncReport {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(SyncEvent::Completed(report)) => return report,
                Ok(_) => continue,
                Err(err) => panic!("event channel closed: {err}"),
            }
        }
    })
    .await
    .expect("timed out waiting for a sync pass")
}

/// Count completed passes published so far without blocking.
#[allow(dead_code)]
pub fn drain_completed(events: &mut broadcast::Receiver<SyncEvent>) -> usize {
    let mut completed = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SyncEvent::Completed(_)) {
            completed += 1;
        }
    }
    completed
}
