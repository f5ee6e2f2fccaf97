//! Storage errors and their mapping into the core taxonomy.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use sleepsync_core::errors::{DatabaseError, Error};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Query(#[from] DieselError),

    #[error("Connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Writer unavailable: {0}")]
    Writer(String),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        let db = match err {
            StorageError::Query(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => DatabaseError::UniqueViolation(info.message().to_string()),
            StorageError::Query(DieselError::NotFound) => {
                return Error::NotFound("Record not found".to_string())
            }
            StorageError::Query(DieselError::DatabaseError(kind, info))
                if is_connectivity_message(info.message()) =>
            {
                DatabaseError::ConnectionFailed(format!("{:?}: {}", kind, info.message()))
            }
            StorageError::Query(other) => DatabaseError::QueryFailed(other.to_string()),
            StorageError::Connection(conn) => DatabaseError::ConnectionFailed(conn.to_string()),
            StorageError::Pool(pool) => DatabaseError::ConnectionFailed(pool.to_string()),
            StorageError::Migration(message) => DatabaseError::MigrationFailed(message),
            StorageError::Writer(message) => DatabaseError::Internal(message),
        };
        Error::Database(db)
    }
}

/// SQLite reports file-level failures as generic database errors.
fn is_connectivity_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["unable to open", "database is locked", "disk i/o error", "readonly database"]
        .iter()
        .any(|needle| message.contains(needle))
}

pub fn is_unique_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}
