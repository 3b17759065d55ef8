//! Batched persistence
//!
//! Translates the ops map into row updates and change-log entries: per table,
//! read current versions, decode each field operation, convert values to
//! their physical columns, and submit everything through one atomic
//! [`TableStore::apply`]. Versions increment by exactly 1; the change-log
//! entry carries the pre-write version.

use crate::engine::EngineConfig;
use crate::error::EngineResult;
use crate::snapshot::SchemaSnapshot;
use cf_core::{CoreError, FieldOp, OpsMap, RawOp, RawOpMap, RawOpMeta};
use cf_store::{ChangeLogEntry, RecordUpdate, StoreError, TableStore, TableUpdate};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

/// Persist every operation in `ops_map` and return the written RawOps per
/// (table, record) for downstream fan-out by the caller.
pub async fn batch_save(
    store: &dyn TableStore,
    config: &EngineConfig,
    src: &str,
    ops_map: &OpsMap,
    snapshot: &SchemaSnapshot,
) -> EngineResult<RawOpMap> {
    let started = Instant::now();
    // One wall-clock stamp for the whole batch.
    let ts = Utc::now().timestamp_millis();

    let mut table_updates: Vec<TableUpdate> = Vec::new();
    let mut log_entries: Vec<ChangeLogEntry> = Vec::new();
    let mut raw_op_map = RawOpMap::new();

    for (table_id, record_ops) in ops_map {
        let table_name = snapshot.table_name(table_id)?;
        let record_ids: Vec<String> = record_ops.keys().cloned().collect();
        let versions = store.record_versions(table_name, &record_ids).await?;

        let mut updates = Vec::with_capacity(record_ops.len());
        for (record_id, ops) in record_ops {
            let version = versions.get(record_id).copied().ok_or_else(|| {
                StoreError::RecordNotFound {
                    table: table_name.to_string(),
                    record_id: record_id.clone(),
                }
            })?;

            let mut columns: HashMap<String, Value> = HashMap::new();
            for op in ops {
                let field_op = FieldOp::decode(op)?;
                let field = snapshot.field(&field_op.field_id)?;
                columns.insert(
                    field.db_column_name.clone(),
                    field.to_store_value(&field_op.new_value),
                );
            }

            let raw_op = RawOp {
                src: src.to_string(),
                seq: config.seq,
                op: ops.clone(),
                v: version,
                m: RawOpMeta { ts },
                c: None,
                d: None,
            };

            log_entries.push(ChangeLogEntry {
                collection: table_id.clone(),
                doc_id: record_id.clone(),
                version: version + 1,
                operation: serde_json::to_value(&raw_op).map_err(CoreError::from)?,
                created_by: config.actor.clone(),
            });
            updates.push(RecordUpdate {
                record_id: record_id.clone(),
                columns,
                version: version + 1,
                last_modified_time: ts,
                last_modified_by: config.actor.clone(),
            });
            raw_op_map
                .entry(table_id.clone())
                .or_default()
                .insert(record_id.clone(), raw_op);
        }

        table_updates.push(TableUpdate {
            table_name: table_name.to_string(),
            updates,
        });
    }

    store.apply(&table_updates, &log_entries).await?;

    log::debug!(
        "batch_save: {} change-log entries across {} tables in {:?}",
        log_entries.len(),
        table_updates.len(),
        started.elapsed()
    );
    Ok(raw_op_map)
}

#[cfg(test)]
#[path = "persist_test.rs"]
mod tests;
