use crate::domain::value_objects::{Collection, MutationType, QueueEntryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmedMutation {
    pub entry_id: QueueEntryId,
    pub mutation_type: MutationType,
    pub entity: Collection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectedMutation {
    pub entry_id: QueueEntryId,
    pub entity: Collection,
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionRefresh {
    pub collection: Collection,
    pub records: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurgeReport {
    pub synced_removed: u64,
    pub stale_discarded: Vec<QueueEntryId>,
}

impl PurgeReport {
    pub fn total(&self) -> u64 {
        self.synced_removed + self.stale_discarded.len() as u64
    }
}

/// Result of draining the mutation queue once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrainReport {
    pub synced: Vec<ConfirmedMutation>,
    pub retried: Vec<QueueEntryId>,
    pub rejected: Vec<RejectedMutation>,
    pub discarded: Vec<QueueEntryId>,
}

impl DrainReport {
    pub fn attempted(&self) -> usize {
        self.synced.len() + self.retried.len() + self.rejected.len() + self.discarded.len()
    }

    pub fn touched_collections(&self) -> Vec<Collection> {
        let mut touched: Vec<Collection> = self
            .synced
            .iter()
            .map(|m| m.entity)
            .chain(self.rejected.iter().map(|m| m.entity))
            .collect();
        touched.sort();
        touched.dedup();
        touched
    }
}

/// Summary of one full sync pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub purged: PurgeReport,
    pub drain: DrainReport,
    pub refreshed: Vec<CollectionRefresh>,
}

impl SyncReport {
    pub fn has_errors(&self) -> bool {
        !self.drain.retried.is_empty()
            || !self.drain.rejected.is_empty()
            || self.refreshed.iter().any(|r| r.error.is_some())
    }
}
