//! Error types for cf-store

use thiserror::Error;

/// Store operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Table not found (S001)
    #[error("[S001] Table not found: {0}")]
    TableNotFound(String),

    /// Record not found (S002)
    #[error("[S002] Record not found: {table}.{record_id}")]
    RecordNotFound { table: String, record_id: String },

    /// Field definition not found (S003)
    #[error("[S003] Field definition not found: {0}")]
    FieldNotFound(String),

    /// Mutex poisoned (S004)
    #[error("[S004] Store mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Internal error (S005)
    #[error("[S005] Internal store error: {0}")]
    Internal(String),
}

/// Result type alias for StoreError
pub type StoreResult<T> = Result<T, StoreError>;
