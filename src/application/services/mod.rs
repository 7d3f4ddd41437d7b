pub mod connectivity;
pub mod offline_service;
pub mod sync_manager;

pub use connectivity::Connectivity;
pub use offline_service::{OfflineService, OfflineServiceTrait};
pub use sync_manager::{SyncEvent, SyncManager, SyncOutcome, SyncState, SyncTrigger};
