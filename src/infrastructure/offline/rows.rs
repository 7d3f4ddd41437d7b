use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecordRow {
    pub id: i64,
    pub data: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QueueEntryRow {
    pub seq: i64,
    pub id: String,
    pub mutation_type: String,
    pub entity: String,
    pub record_id: Option<i64>,
    pub data: String,
    pub created_at: i64,
    pub synced: bool,
    pub synced_at: Option<i64>,
    pub status: String,
    pub attempts: i64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncStatusRow {
    pub entity_type: String,
    pub last_sync: Option<i64>,
    pub status: String,
    pub last_error: Option<String>,
    pub updated_at: i64,
}
