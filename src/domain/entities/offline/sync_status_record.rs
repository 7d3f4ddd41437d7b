use crate::domain::value_objects::{Collection, SyncOutcomeStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncStatusRecord {
    pub entity_type: Collection,
    /// Start time of the last successful pull for this collection.
    pub last_sync: Option<DateTime<Utc>>,
    pub status: SyncOutcomeStatus,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}
