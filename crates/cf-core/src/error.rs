//! Error types for cf-core

use thiserror::Error;

/// Core error type for Cellflow
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Circular dependency detected in the field graph
    #[error("[C001] Circular field dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// C002: Field id not present in the graph
    #[error("[C002] Field not found in dependency graph: {field_id}")]
    FieldNotFound { field_id: String },

    /// C003: A field operation could not be decoded back to (fieldId, newValue)
    #[error("[C003] Malformed field operation: {details}")]
    MalformedOperation { details: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
