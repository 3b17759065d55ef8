//! Origin-record discovery
//!
//! For a changed computed field, determines the initial set of records whose
//! stored value must be recalculated, branching on the field's relationship
//! kind.

use crate::error::{EngineError, EngineResult};
use crate::snapshot::SchemaSnapshot;
use cf_core::{FieldDescriptor, LookupSpec, Relationship};
use cf_store::TableStore;

/// Opaque join key across the origin/affected/dependent sets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    /// Physical table name
    pub table_name: String,
    pub id: String,
}

impl RecordRef {
    pub fn new(table_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            id: id.into(),
        }
    }
}

/// Every record id of the field's own table
async fn self_origin_records(
    store: &dyn TableStore,
    table_name: &str,
) -> EngineResult<Vec<RecordRef>> {
    let ids = store.record_ids(table_name).await?;
    Ok(ids
        .into_iter()
        .map(|id| RecordRef::new(table_name, id))
        .collect())
}

/// The current table holds the foreign key: origins are the distinct
/// non-null key values, mapped into the foreign table's id space.
async fn many_to_one_origin_records(
    store: &dyn TableStore,
    table_name: &str,
    snapshot: &SchemaSnapshot,
    lookup: &LookupSpec,
) -> EngineResult<Vec<RecordRef>> {
    let foreign_table = snapshot.table_name(&lookup.foreign_table_id)?;
    let keys = store
        .non_null_key_values(table_name, &lookup.foreign_key_column)
        .await?;
    Ok(keys
        .into_iter()
        .map(|id| RecordRef::new(foreign_table, id))
        .collect())
}

/// The foreign table holds the foreign key: origins are its rows with a
/// non-null key. One row, one candidate.
async fn one_to_many_origin_records(
    store: &dyn TableStore,
    snapshot: &SchemaSnapshot,
    lookup: &LookupSpec,
) -> EngineResult<Vec<RecordRef>> {
    let foreign_table = snapshot.table_name(&lookup.foreign_table_id)?;
    let ids = store
        .non_null_key_records(foreign_table, &lookup.foreign_key_column)
        .await?;
    Ok(ids
        .into_iter()
        .map(|id| RecordRef::new(foreign_table, id))
        .collect())
}

async fn lookup_origin_records(
    store: &dyn TableStore,
    table_name: &str,
    snapshot: &SchemaSnapshot,
    field: &FieldDescriptor,
    lookup: &LookupSpec,
) -> EngineResult<Vec<RecordRef>> {
    match lookup.relationship {
        Relationship::ManyToOne => {
            many_to_one_origin_records(store, table_name, snapshot, lookup).await
        }
        Relationship::OneToMany => one_to_many_origin_records(store, snapshot, lookup).await,
        Relationship::OneToOne | Relationship::ManyToMany => {
            Err(EngineError::InvalidRelationship {
                field_id: field.id.clone(),
            })
        }
    }
}

/// The initial record set for one changed computed field.
///
/// Lookup origins are resolved first; when a lookup field has nothing to look
/// up, the field is short-circuited with an empty result and no self-table
/// scan happens. Otherwise the field's own table rows are appended.
pub async fn origin_computed_records(
    store: &dyn TableStore,
    table_id: &str,
    snapshot: &SchemaSnapshot,
    field: &FieldDescriptor,
) -> EngineResult<Vec<RecordRef>> {
    let table_name = snapshot.table_name(table_id)?;
    let mut records = Vec::new();

    if let Some(lookup) = &field.lookup {
        records = lookup_origin_records(store, table_name, snapshot, field, lookup).await?;
        if records.is_empty() {
            return Ok(records);
        }
    }

    records.extend(self_origin_records(store, table_name).await?);
    Ok(records)
}

#[cfg(test)]
#[path = "origin_test.rs"]
mod tests;
