pub mod collection;
pub mod mutation_type;
pub mod payload;
pub mod queue_entry_id;
pub mod sync_state;

pub use collection::Collection;
pub use mutation_type::MutationType;
pub use payload::RecordPayload;
pub use queue_entry_id::QueueEntryId;
pub use sync_state::{QueueEntryStatus, SyncOutcomeStatus};
