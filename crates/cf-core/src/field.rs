//! Field schema model
//!
//! [`FieldDescriptor`] is the immutable, per-invocation snapshot of one field
//! definition: its logical type, whether it is computed, its physical column,
//! and (for lookup/rollup fields) the relationship it reads through.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Logical field type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    SingleLineText,
    Number,
    Checkbox,
    Date,
    SingleSelect,
    Formula,
    Rollup,
    Link,
}

/// Direction and cardinality of the foreign-key link between two tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Relationship {
    /// The field's own table holds the foreign key; many rows point at one
    /// foreign row.
    ManyToOne,
    /// The foreign table holds the foreign key; one row is pointed at by many
    /// foreign rows.
    OneToMany,
    /// Declared by the schema but not supported by the calculation engine
    OneToOne,
    /// Declared by the schema but not supported by the calculation engine
    ManyToMany,
}

/// Physical column type of a field's storage column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DbColumnType {
    Text,
    Integer,
    Real,
    Boolean,
    Datetime,
    Json,
}

/// Lookup configuration for a field that reads values through a relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupSpec {
    pub relationship: Relationship,

    /// Table the values are looked up from
    pub foreign_table_id: String,

    /// Physical column holding the foreign key. Lives in the field's own
    /// table for `ManyToOne`, in the foreign table for `OneToMany`.
    pub foreign_key_column: String,

    /// The field in the foreign table whose values are read
    pub lookup_field_id: String,
}

/// One field definition, immutable for the duration of a recomputation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub id: String,

    /// Owning table id
    pub table_id: String,

    pub field_type: FieldType,

    /// Whether the stored value is derived rather than user-set
    pub is_computed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup: Option<LookupSpec>,

    /// Physical column name in the record table
    pub db_column_name: String,

    pub db_column_type: DbColumnType,
}

impl FieldDescriptor {
    /// Whether this field is a link between tables (supplies records, not a
    /// value to assign).
    pub fn is_link(&self) -> bool {
        self.field_type == FieldType::Link
    }

    /// Convert a cell value to its physical column representation.
    ///
    /// JSON columns store the serialized text; scalar columns store the value
    /// as-is (the store is responsible for column-type coercion on write).
    pub fn to_store_value(&self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        match self.db_column_type {
            DbColumnType::Json => Value::String(value.to_string()),
            _ => value.clone(),
        }
    }
}

#[cfg(test)]
#[path = "field_test.rs"]
mod tests;
