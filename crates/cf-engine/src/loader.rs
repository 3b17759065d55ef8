//! Batched record loading
//!
//! Materializes the origin, affected, and dependent record sets with one
//! read per physical table, keyed by record id. Only the columns the
//! snapshot's fields require are fetched.

use crate::error::EngineResult;
use crate::expand::RecordRefItem;
use crate::origin::RecordRef;
use crate::snapshot::SchemaSnapshot;
use cf_store::{RecordRow, TableStore};
use std::collections::{BTreeMap, HashMap, HashSet};

/// table name -> record id -> loaded row
pub type RecordsByTable = HashMap<String, BTreeMap<String, RecordRow>>;

/// Load every referenced record, one batched read per physical table.
/// Tables with no referenced records are skipped entirely.
pub async fn load_record_batches(
    store: &dyn TableStore,
    origins: &[RecordRef],
    affected: &[RecordRefItem],
    dependent: &[RecordRefItem],
    snapshot: &SchemaSnapshot,
) -> EngineResult<RecordsByTable> {
    let mut ids_by_table: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    let mut push = |table: &str, id: &str, ids_by_table: &mut BTreeMap<String, Vec<String>>| {
        if seen.insert((table.to_string(), id.to_string())) {
            ids_by_table
                .entry(table.to_string())
                .or_default()
                .push(id.to_string());
        }
    };

    for r in origins {
        push(&r.table_name, &r.id, &mut ids_by_table);
    }
    for r in affected {
        push(&r.table_name, &r.id, &mut ids_by_table);
    }
    for r in dependent {
        push(&r.table_name, &r.id, &mut ids_by_table);
    }

    let mut records: RecordsByTable = HashMap::new();
    for (table, ids) in ids_by_table {
        if ids.is_empty() {
            continue;
        }
        let columns = snapshot.required_columns(&table)?;
        let rows = store.read_records(&table, &ids, &columns).await?;
        let keyed = rows.into_iter().map(|row| (row.id.clone(), row)).collect();
        records.insert(table, keyed);
    }

    Ok(records)
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod tests;
