use crate::domain::entities::QueueEntry;
use crate::domain::value_objects::Collection;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Offline, timeouts, 5xx, 408 and 429. Retried on the next pass.
    #[error("retryable remote failure: {0}")]
    Retryable(String),

    /// The server will never accept this request as sent.
    #[error("permanent remote failure (status {status:?}): {message}")]
    Permanent { status: Option<u16>, message: String },
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Retryable(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Retryable(_) => None,
            RemoteError::Permanent { status, .. } => *status,
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            408 | 429 => RemoteError::Retryable(format!("HTTP {status}: {body}")),
            400..=499 => RemoteError::Permanent {
                status: Some(status),
                message: body,
            },
            _ => RemoteError::Retryable(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Replay one queued mutation. Only the response status decides success.
    async fn submit(&self, entry: &QueueEntry) -> Result<(), RemoteError>;
    /// Records updated after `since`; everything when `since` is `None`.
    async fn fetch_updated(
        &self,
        collection: Collection,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Value>, RemoteError>;
}
