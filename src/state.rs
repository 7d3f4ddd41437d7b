use crate::application::ports::{LocalStore, MutationQueue, RemoteApi, SyncStatusStore};
use crate::application::services::{Connectivity, OfflineService, SyncManager};
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::offline::{
    FallbackLocalStore, SqliteLocalStore, SqliteMutationQueue, SqliteSyncStatusStore,
};
use crate::infrastructure::remote::HttpRemoteApi;
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::path::Path;
use std::sync::Arc;

/// Wired-up services for one process.
#[derive(Clone)]
pub struct AppState {
    pub pool: ConnectionPool,
    pub store: Arc<FallbackLocalStore>,
    pub queue: Arc<dyn MutationQueue>,
    pub statuses: Arc<dyn SyncStatusStore>,
    pub connectivity: Connectivity,
    pub offline_service: Arc<OfflineService>,
    pub sync_manager: Arc<SyncManager>,
}

impl AppState {
    pub async fn initialize(config: &AppConfig) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;

        let pool = Self::open_pool(config).await?;
        let remote: Arc<dyn RemoteApi> = Arc::new(HttpRemoteApi::new(&config.remote)?);
        Self::from_parts(pool, remote, config).await
    }

    /// Wire the services over an existing pool and remote client.
    pub async fn from_parts(
        pool: ConnectionPool,
        remote: Arc<dyn RemoteApi>,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        pool.migrate().await?;

        let sqlite_store: Arc<dyn LocalStore> =
            Arc::new(SqliteLocalStore::new(pool.get_pool().clone()));
        let store = Arc::new(FallbackLocalStore::new(sqlite_store));
        let queue: Arc<dyn MutationQueue> =
            Arc::new(SqliteMutationQueue::new(pool.get_pool().clone()));
        let statuses: Arc<dyn SyncStatusStore> =
            Arc::new(SqliteSyncStatusStore::new(pool.get_pool().clone()));
        let connectivity = Connectivity::new(config.sync.start_online);

        let offline_service = Arc::new(OfflineService::new(store.clone(), queue.clone()));
        let sync_manager = SyncManager::new(
            store.clone(),
            queue.clone(),
            statuses.clone(),
            remote,
            connectivity.clone(),
            config.sync.clone(),
        );

        Ok(Self {
            pool,
            store,
            queue,
            statuses,
            connectivity,
            offline_service,
            sync_manager,
        })
    }

    pub async fn shutdown(&self) {
        self.sync_manager.stop().await;
        self.pool.close().await;
    }

    /// An unusable database file degrades the whole session to an in-memory database.
    async fn open_pool(config: &AppConfig) -> Result<ConnectionPool, AppError> {
        if let Some(parent) = database_parent_dir(&config.database.url) {
            if let Err(err) = std::fs::create_dir_all(&parent) {
                tracing::warn!(
                    target: "offline::store",
                    path = %parent.display(),
                    error = %err,
                    "failed to create database directory"
                );
            }
        }

        match ConnectionPool::new(&config.database.url, config.database.max_connections).await {
            Ok(pool) => Ok(pool),
            Err(err) => {
                tracing::warn!(
                    target: "offline::store",
                    url = %config.database.url,
                    error = %err,
                    "database unavailable, continuing in memory-only mode"
                );
                Ok(ConnectionPool::from_memory().await?)
            }
        }
    }
}

fn database_parent_dir(url: &str) -> Option<std::path::PathBuf> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}
