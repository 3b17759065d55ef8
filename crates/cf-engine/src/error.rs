//! Error types for cf-engine

use thiserror::Error;

/// Calculation engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// G001: A lookup field declares a relationship kind the engine cannot
    /// propagate through. Indicates a corrupt field definition; fatal for the
    /// whole batch.
    #[error("[G001] Invalid relationship on lookup field {field_id}")]
    InvalidRelationship { field_id: String },

    /// G002: A field referenced by the dependency graph is missing from the
    /// schema snapshot
    #[error("[G002] Field not in schema snapshot: {field_id}")]
    UnknownField { field_id: String },

    /// G003: A table id has no physical table name
    #[error("[G003] Table not in schema snapshot: {table_id}")]
    UnknownTable { table_id: String },

    /// G004: The value computation collaborator failed
    #[error("[G004] Value computation failed for field {field_id}: {message}")]
    Compute { field_id: String, message: String },

    /// Core error (graph ordering, op codec)
    #[error(transparent)]
    Core(#[from] cf_core::CoreError),

    /// Store error
    #[error(transparent)]
    Store(#[from] cf_store::StoreError),
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;
