use crate::domain::value_objects::RecordPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A clinical record (patient, visit, prescription or lab result) held locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: i64,
    pub data: RecordPayload,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new(id: i64, data: RecordPayload) -> Self {
        Self {
            id,
            data,
            updated_at: Utc::now(),
        }
    }

    pub fn with_updated_at(id: i64, data: RecordPayload, updated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            data,
            updated_at,
        }
    }

    /// Build a record from a server payload; `None` when it has no numeric id.
    pub fn from_remote(value: serde_json::Value) -> Option<Self> {
        let payload = RecordPayload::new(value).ok()?;
        let id = payload.numeric_id()?;
        Some(Self::new(id, payload))
    }
}
