pub mod local_store;
pub mod mutation_queue;
pub mod remote_api;
pub mod sync_status_store;

pub use local_store::LocalStore;
pub use mutation_queue::{DEFAULT_RETENTION_DAYS, MutationQueue};
pub use remote_api::{RemoteApi, RemoteError};
pub use sync_status_store::SyncStatusStore;
