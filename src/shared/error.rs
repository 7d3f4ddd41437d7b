use std::fmt;

use crate::application::ports::remote_api::RemoteError;

#[derive(Debug)]
pub enum AppError {
    Database(String),
    Storage(String),
    Remote(RemoteError),
    ValidationError(String),
    ConfigurationError(String),
    SerializationError(String),
    DeserializationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Remote(err) => write!(f, "Remote error: {}", err),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Storage that can no longer be used this session, as opposed to a failed
    /// statement or a busy database.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }
}

// SQLite primary result codes for a database that cannot be read or written:
// READONLY, IOERR, CORRUPT, FULL, CANTOPEN, NOTADB.
const UNUSABLE_SQLITE_CODES: [i32; 6] = [8, 10, 11, 13, 14, 26];

fn is_unusable_storage(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| UNUSABLE_SQLITE_CODES.contains(&(code & 0xff))),
        _ => false,
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if is_unusable_storage(&err) {
            AppError::Storage(err.to_string())
        } else {
            AppError::Database(err.to_string())
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        AppError::Remote(err)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
