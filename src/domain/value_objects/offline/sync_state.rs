use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome recorded in a collection's sync status row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcomeStatus {
    Success,
    Error,
    Pending,
    Unknown(String),
}

impl SyncOutcomeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SyncOutcomeStatus::Success => "success",
            SyncOutcomeStatus::Error => "error",
            SyncOutcomeStatus::Pending => "pending",
            SyncOutcomeStatus::Unknown(value) => value.as_str(),
        }
    }
}

impl fmt::Display for SyncOutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for SyncOutcomeStatus {
    fn from(value: &str) -> Self {
        match value {
            "success" => SyncOutcomeStatus::Success,
            "error" => SyncOutcomeStatus::Error,
            "pending" => SyncOutcomeStatus::Pending,
            other => SyncOutcomeStatus::Unknown(other.to_string()),
        }
    }
}

/// Lifecycle state of a queue entry that has not been confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueEntryStatus {
    Pending,
    Rejected,
    Unknown(String),
}

impl QueueEntryStatus {
    pub fn as_str(&self) -> &str {
        match self {
            QueueEntryStatus::Pending => "pending",
            QueueEntryStatus::Rejected => "rejected",
            QueueEntryStatus::Unknown(value) => value.as_str(),
        }
    }
}

impl From<&str> for QueueEntryStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => QueueEntryStatus::Pending,
            "rejected" => QueueEntryStatus::Rejected,
            other => QueueEntryStatus::Unknown(other.to_string()),
        }
    }
}
