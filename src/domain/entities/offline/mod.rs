pub mod queue_entry;
pub mod record;
pub mod saved_mutation;
pub mod sync_report;
pub mod sync_status_record;

pub use queue_entry::{QueueEntry, QueueEntryDraft};
pub use record::Record;
pub use saved_mutation::SavedMutation;
pub use sync_report::{
    CollectionRefresh, ConfirmedMutation, DrainReport, PurgeReport, RejectedMutation, SyncReport,
};
pub use sync_status_record::SyncStatusRecord;
