//! Shared test utilities for cf-engine

use crate::compute::ValueComputer;
use crate::error::EngineResult;
use cf_core::{
    DbColumnType, FieldDescriptor, FieldType, LookupSpec, Relationship,
};
use cf_store::RecordRow;
use serde_json::{json, Value};

/// Create a plain (non-computed) number field
pub(crate) fn plain_field(id: &str, table: &str, column: &str) -> FieldDescriptor {
    FieldDescriptor {
        id: id.to_string(),
        table_id: table.to_string(),
        field_type: FieldType::Number,
        is_computed: false,
        lookup: None,
        db_column_name: column.to_string(),
        db_column_type: DbColumnType::Real,
    }
}

/// Create a self-relationship formula field
pub(crate) fn formula_field(id: &str, table: &str, column: &str) -> FieldDescriptor {
    FieldDescriptor {
        field_type: FieldType::Formula,
        is_computed: true,
        ..plain_field(id, table, column)
    }
}

/// Create a computed lookup/rollup field reading through a relationship
pub(crate) fn lookup_field(
    id: &str,
    table: &str,
    column: &str,
    relationship: Relationship,
    foreign_table: &str,
    key_column: &str,
    lookup_field_id: &str,
) -> FieldDescriptor {
    FieldDescriptor {
        field_type: FieldType::Rollup,
        is_computed: true,
        lookup: Some(LookupSpec {
            relationship,
            foreign_table_id: foreign_table.to_string(),
            foreign_key_column: key_column.to_string(),
            lookup_field_id: lookup_field_id.to_string(),
        }),
        ..plain_field(id, table, column)
    }
}

/// Test value computer.
///
/// Formula fields double the `a` column; many-to-one lookups take the single
/// looked-up value; one-to-many rollups sum the looked-up numbers.
pub(crate) struct TestComputer;

impl ValueComputer for TestComputer {
    fn compute(
        &self,
        field: &FieldDescriptor,
        record: &RecordRow,
        lookup_values: &[Value],
    ) -> EngineResult<Value> {
        match &field.lookup {
            Some(spec) if spec.relationship == Relationship::ManyToOne => {
                Ok(lookup_values.first().cloned().unwrap_or(Value::Null))
            }
            Some(_) => {
                let sum: f64 = lookup_values.iter().filter_map(Value::as_f64).sum();
                Ok(json!(sum))
            }
            None => match record.fields.get("a").and_then(Value::as_f64) {
                Some(a) => Ok(json!(a * 2.0)),
                None => Ok(Value::Null),
            },
        }
    }
}
