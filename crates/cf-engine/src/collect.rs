//! Change collection
//!
//! Walks a topological order strictly in sequence, recomputing each computed
//! field for its affected records and emitting a [`CellChange`] whenever the
//! fresh value differs from the stored one. Recomputed values are written
//! back into the loaded rows so downstream fields read them, not the stale
//! stored values.

use crate::compute::ValueComputer;
use crate::error::{EngineError, EngineResult};
use crate::expand::RecordRefItem;
use crate::loader::RecordsByTable;
use crate::origin::RecordRef;
use crate::snapshot::SchemaSnapshot;
use cf_core::{CellChange, FieldDescriptor, Relationship, TopoItem};
use cf_store::RecordRow;
use serde_json::Value;
use std::collections::HashSet;

/// Recompute one topological order over the loaded records
pub fn collect_changes(
    topo_order: &[TopoItem],
    snapshot: &SchemaSnapshot,
    computer: &dyn ValueComputer,
    records: &mut RecordsByTable,
    origins: &[RecordRef],
    affected: &[RecordRefItem],
) -> EngineResult<Vec<CellChange>> {
    let mut changes = Vec::new();

    for item in topo_order {
        let field = snapshot.field(&item.field_id)?;
        if !field.is_computed || field.is_link() {
            continue;
        }
        let table_name = snapshot.table_name(&field.table_id)?.to_string();

        for record_id in target_record_ids(field, &table_name, origins, affected) {
            let Some(row) = records
                .get(&table_name)
                .and_then(|rows| rows.get(&record_id))
                .cloned()
            else {
                continue;
            };

            let lookup_values = gather_lookup_values(field, &row, snapshot, records)?;
            let old_value = row
                .fields
                .get(&field.db_column_name)
                .cloned()
                .unwrap_or(Value::Null);
            let new_value = computer.compute(field, &row, &lookup_values)?;

            if computer.values_equal(field, &old_value, &new_value) {
                continue;
            }

            if let Some(live) = records
                .get_mut(&table_name)
                .and_then(|rows| rows.get_mut(&record_id))
            {
                live.fields
                    .insert(field.db_column_name.clone(), new_value.clone());
            }

            changes.push(CellChange {
                table_id: field.table_id.clone(),
                record_id,
                field_id: field.id.clone(),
                old_value,
                new_value,
            });
        }
    }

    Ok(changes)
}

/// The records to recompute for one field: the expansion items tagged with
/// it, or the origin records of its table when no hop produced a tag (the
/// self-table baseline).
fn target_record_ids(
    field: &FieldDescriptor,
    table_name: &str,
    origins: &[RecordRef],
    affected: &[RecordRefItem],
) -> Vec<String> {
    let mut seen = HashSet::new();
    let tagged: Vec<String> = affected
        .iter()
        .filter(|i| i.field_id.as_deref() == Some(field.id.as_str()))
        .filter(|i| i.table_name == table_name)
        .filter(|i| seen.insert(i.id.clone()))
        .map(|i| i.id.clone())
        .collect();
    if !tagged.is_empty() {
        return tagged;
    }

    let mut seen = HashSet::new();
    origins
        .iter()
        .filter(|r| r.table_name == table_name)
        .filter(|r| seen.insert(r.id.clone()))
        .map(|r| r.id.clone())
        .collect()
}

/// Values read through the field's relationship, from already-loaded (and
/// possibly already-recomputed) rows.
fn gather_lookup_values(
    field: &FieldDescriptor,
    row: &RecordRow,
    snapshot: &SchemaSnapshot,
    records: &RecordsByTable,
) -> EngineResult<Vec<Value>> {
    let Some(lookup) = &field.lookup else {
        return Ok(Vec::new());
    };
    let foreign_table = snapshot.table_name(&lookup.foreign_table_id)?;
    let lookup_column = &snapshot.field(&lookup.lookup_field_id)?.db_column_name;

    match lookup.relationship {
        Relationship::ManyToOne => {
            let Some(key) = row
                .fields
                .get(&lookup.foreign_key_column)
                .and_then(Value::as_str)
            else {
                return Ok(Vec::new());
            };
            let value = records
                .get(foreign_table)
                .and_then(|rows| rows.get(key))
                .and_then(|r| r.fields.get(lookup_column))
                .cloned()
                .unwrap_or(Value::Null);
            Ok(vec![value])
        }
        Relationship::OneToMany => {
            let Some(rows) = records.get(foreign_table) else {
                return Ok(Vec::new());
            };
            Ok(rows
                .values()
                .filter(|r| {
                    r.fields.get(&lookup.foreign_key_column).and_then(Value::as_str)
                        == Some(row.id.as_str())
                })
                .map(|r| r.fields.get(lookup_column).cloned().unwrap_or(Value::Null))
                .collect())
        }
        Relationship::OneToOne | Relationship::ManyToMany => {
            Err(EngineError::InvalidRelationship {
                field_id: field.id.clone(),
            })
        }
    }
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
