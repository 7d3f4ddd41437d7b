pub mod fallback_store;
pub mod locks;
mod mappers;
pub mod memory_store;
mod rows;
pub mod sqlite_queue;
pub mod sqlite_store;
pub mod sqlite_sync_status;

pub use fallback_store::FallbackLocalStore;
pub use locks::CollectionLocks;
pub use memory_store::InMemoryLocalStore;
pub use sqlite_queue::SqliteMutationQueue;
pub use sqlite_store::SqliteLocalStore;
pub use sqlite_sync_status::SqliteSyncStatusStore;
