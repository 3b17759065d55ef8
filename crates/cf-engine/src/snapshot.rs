//! Read-only schema snapshot for one recomputation pass
//!
//! Loaded once per invocation: every field in the dependency closure plus
//! the physical names of every table those fields touch. Immutable for the
//! duration of the pass.

use crate::error::{EngineError, EngineResult};
use cf_core::{FieldDescriptor, Relationship};
use cf_store::TableStore;
use std::collections::HashMap;

/// Field and table metadata for one calculation pass
#[derive(Debug)]
pub struct SchemaSnapshot {
    field_map: HashMap<String, FieldDescriptor>,
    table_name_by_id: HashMap<String, String>,
}

impl SchemaSnapshot {
    /// Load descriptors for `field_ids` and resolve every table they touch
    /// (owning tables and lookup foreign tables).
    pub async fn load(store: &dyn TableStore, field_ids: &[String]) -> EngineResult<Self> {
        let descriptors = store.field_descriptors(field_ids).await?;

        let mut table_ids: Vec<String> = Vec::new();
        for field in &descriptors {
            if !table_ids.contains(&field.table_id) {
                table_ids.push(field.table_id.clone());
            }
            if let Some(lookup) = &field.lookup {
                if !table_ids.contains(&lookup.foreign_table_id) {
                    table_ids.push(lookup.foreign_table_id.clone());
                }
            }
        }
        let table_name_by_id = store.table_names(&table_ids).await?;

        let field_map = descriptors
            .into_iter()
            .map(|f| (f.id.clone(), f))
            .collect();

        Ok(Self {
            field_map,
            table_name_by_id,
        })
    }

    pub fn field(&self, field_id: &str) -> EngineResult<&FieldDescriptor> {
        self.field_map
            .get(field_id)
            .ok_or_else(|| EngineError::UnknownField {
                field_id: field_id.to_string(),
            })
    }

    pub fn contains_field(&self, field_id: &str) -> bool {
        self.field_map.contains_key(field_id)
    }

    pub fn table_name(&self, table_id: &str) -> EngineResult<&str> {
        self.table_name_by_id
            .get(table_id)
            .map(String::as_str)
            .ok_or_else(|| EngineError::UnknownTable {
                table_id: table_id.to_string(),
            })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.field_map.values()
    }

    /// Physical columns that must be read from `table_name`: the storage
    /// columns of its own fields plus every foreign-key column hosted there
    /// (many-to-one keys live in the field's own table, one-to-many keys in
    /// the foreign table).
    pub fn required_columns(&self, table_name: &str) -> EngineResult<Vec<String>> {
        let mut columns: Vec<String> = Vec::new();

        for field in self.field_map.values() {
            let own_table = self.table_name(&field.table_id)?;
            if own_table == table_name {
                columns.push(field.db_column_name.clone());
            }

            if let Some(lookup) = &field.lookup {
                let key_host = match lookup.relationship {
                    Relationship::ManyToOne => own_table,
                    Relationship::OneToMany => self.table_name(&lookup.foreign_table_id)?,
                    Relationship::OneToOne | Relationship::ManyToMany => {
                        return Err(EngineError::InvalidRelationship {
                            field_id: field.id.clone(),
                        })
                    }
                };
                if key_host == table_name {
                    columns.push(lookup.foreign_key_column.clone());
                }
            }
        }

        columns.sort();
        columns.dedup();
        Ok(columns)
    }
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod tests;
