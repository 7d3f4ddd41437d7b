use super::rows::{QueueEntryRow, RecordRow, SyncStatusRow};
use crate::domain::entities::{QueueEntry, Record, SyncStatusRecord};
use crate::domain::value_objects::{
    Collection, MutationType, QueueEntryId, QueueEntryStatus, RecordPayload, SyncOutcomeStatus,
};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};

pub fn record_from_row(row: RecordRow) -> Result<Record, AppError> {
    let data = RecordPayload::from_json_str(&row.data).map_err(AppError::DeserializationError)?;
    Ok(Record::with_updated_at(
        row.id,
        data,
        timestamp_to_datetime(row.updated_at),
    ))
}

pub fn queue_entry_from_row(row: QueueEntryRow) -> Result<QueueEntry, AppError> {
    let id = QueueEntryId::new(row.id).map_err(AppError::ValidationError)?;
    let mutation_type =
        MutationType::parse(&row.mutation_type).map_err(AppError::ValidationError)?;
    let entity = Collection::parse(&row.entity).map_err(AppError::ValidationError)?;
    let data = RecordPayload::from_json_str(&row.data).map_err(AppError::DeserializationError)?;
    let attempts = u32::try_from(row.attempts)
        .map_err(|_| AppError::ValidationError("attempts cannot be negative".to_string()))?;

    Ok(QueueEntry {
        id,
        mutation_type,
        entity,
        record_id: row.record_id,
        data,
        timestamp: timestamp_to_datetime(row.created_at),
        synced: row.synced,
        status: QueueEntryStatus::from(row.status.as_str()),
        attempts,
        last_error: row.last_error,
    })
}

pub fn sync_status_from_row(row: SyncStatusRow) -> Result<SyncStatusRecord, AppError> {
    let entity_type = Collection::parse(&row.entity_type).map_err(AppError::ValidationError)?;
    Ok(SyncStatusRecord {
        entity_type,
        last_sync: row.last_sync.map(timestamp_to_datetime),
        status: SyncOutcomeStatus::from(row.status.as_str()),
        last_error: row.last_error,
        updated_at: timestamp_to_datetime(row.updated_at),
    })
}

pub fn payload_to_json(payload: &RecordPayload) -> Result<String, AppError> {
    serde_json::to_string(payload.as_json())
        .map_err(|err| AppError::SerializationError(err.to_string()))
}

pub fn timestamp_to_datetime(ts_millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ts_millis).unwrap_or_else(Utc::now)
}
