use crate::domain::value_objects::{Collection, QueueEntryId};
use serde::{Deserialize, Serialize};

/// A local write and the queue entry that will replay it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedMutation {
    pub entity: Collection,
    pub record_id: i64,
    pub entry_id: QueueEntryId,
}

impl SavedMutation {
    pub fn is_provisional(&self) -> bool {
        self.record_id < 0
    }
}
