//! Value computation seam
//!
//! Field-type-specific formulas live outside the engine. The collector hands
//! a [`ValueComputer`] the field definition, the record's currently known
//! values, and any looked-up upstream values, and gets the fresh cell value
//! back. Equality semantics are type-dependent and owned by the same
//! collaborator.

use crate::error::EngineResult;
use cf_core::FieldDescriptor;
use cf_store::RecordRow;
use serde_json::Value;

/// Computes a field's value for one record
pub trait ValueComputer: Send + Sync {
    /// Recompute `field` for `record`.
    ///
    /// `lookup_values` carries the values read through the field's
    /// relationship: one element for a many-to-one lookup, every referencing
    /// row's value for a one-to-many lookup, empty for self-relationship
    /// fields (which read their inputs from `record` directly).
    fn compute(
        &self,
        field: &FieldDescriptor,
        record: &RecordRow,
        lookup_values: &[Value],
    ) -> EngineResult<Value>;

    /// Whether two cell values are equal for change-detection purposes.
    ///
    /// The default is strict JSON equality; loaded records already carry an
    /// explicit null for absent columns. Override for types with looser
    /// stored representations.
    fn values_equal(&self, _field: &FieldDescriptor, a: &Value, b: &Value) -> bool {
        a == b
    }
}
