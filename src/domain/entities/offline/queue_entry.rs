use crate::domain::value_objects::{
    Collection, MutationType, QueueEntryId, QueueEntryStatus, RecordPayload,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A pending, not-yet-confirmed mutation destined for the remote server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    pub id: QueueEntryId,
    pub mutation_type: MutationType,
    pub entity: Collection,
    pub record_id: Option<i64>,
    pub data: RecordPayload,
    pub timestamp: DateTime<Utc>,
    pub synced: bool,
    pub status: QueueEntryStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl QueueEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timestamp)
    }

    pub fn is_older_than(&self, horizon: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) > horizon
    }

    /// Server-side id the mutation targets. Creates have none until the server assigns one.
    pub fn remote_id(&self) -> Option<i64> {
        match self.mutation_type {
            MutationType::Create => None,
            MutationType::Update | MutationType::Delete => self
                .data
                .numeric_id()
                .or(self.record_id)
                .filter(|id| *id >= 0),
        }
    }

    /// Provisional local id to drop once a create is confirmed.
    pub fn provisional_record_id(&self) -> Option<i64> {
        match self.mutation_type {
            MutationType::Create => self.record_id.filter(|id| *id < 0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueEntryDraft {
    pub mutation_type: MutationType,
    pub entity: Collection,
    pub record_id: Option<i64>,
    pub data: RecordPayload,
    pub timestamp: DateTime<Utc>,
}

impl QueueEntryDraft {
    pub fn new(mutation_type: MutationType, entity: Collection, data: RecordPayload) -> Self {
        let record_id = data.numeric_id();
        Self {
            mutation_type,
            entity,
            record_id,
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn with_record_id(mut self, record_id: i64) -> Self {
        self.record_id = Some(record_id);
        self
    }

    /// Backdate or pin the entry timestamp. Used when replaying imported mutations.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
