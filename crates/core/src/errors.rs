//! Error taxonomy shared by every sleepsync crate.

use thiserror::Error;

/// Result type alias used across the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for domain and storage operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The natural key is already taken (e.g. registering an existing email).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport-level failure talking to another service.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response from another service.
    #[error("Remote service error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// A collaborator required for the operation is not configured.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Storage-layer failures. Every variant counts as a storage failure for the
/// primary/fallback selector.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Pool creation failed: {0}")]
    PoolCreationFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DatabaseError {
    /// True when the store could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolCreationFailed(_)
        )
    }
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Storage-layer failure, as opposed to a domain outcome.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Error::Database(_))
    }

    /// Storage failure caused by an unreachable store.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Error::Database(db) => db.is_connectivity(),
            _ => false,
        }
    }
}
