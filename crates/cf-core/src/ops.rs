//! Cell changes and the change-log operation model
//!
//! A recomputation pass produces [`CellChange`]s, which are merged
//! last-writer-wins per (table, record, field), encoded as [`FieldOp`]s into
//! an [`OpsMap`], and finally persisted as one [`RawOp`] change-log entry per
//! touched record.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};

/// One cell-level change: a differing recomputed value for (table, record, field)
#[derive(Debug, Clone, PartialEq)]
pub struct CellChange {
    pub table_id: String,
    pub record_id: String,
    pub field_id: String,
    pub old_value: Value,
    pub new_value: Value,
}

/// table id -> record id -> ordered, encoded field operations
///
/// The sole persistence input; built fresh per invocation and consumed
/// immediately. `BTreeMap` keeps persistence order deterministic.
pub type OpsMap = BTreeMap<String, BTreeMap<String, Vec<Value>>>;

/// table id -> record id -> persisted change-log entry
pub type RawOpMap = BTreeMap<String, BTreeMap<String, RawOp>>;

/// A single field's (fieldId, newValue) assignment in json0 shape:
/// `{"p": ["record", fieldId], "od": oldValue, "oi": newValue}`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOp {
    pub field_id: String,
    pub old_value: Value,
    pub new_value: Value,
}

impl FieldOp {
    pub fn encode(&self) -> Value {
        json!({
            "p": ["record", self.field_id],
            "od": self.old_value,
            "oi": self.new_value,
        })
    }

    /// Decode an encoded operation back to its (fieldId, newValue) pair.
    ///
    /// Any shape violation is a contract breach from the op producer and
    /// fails with [`CoreError::MalformedOperation`].
    pub fn decode(op: &Value) -> CoreResult<FieldOp> {
        let malformed = |details: &str| CoreError::MalformedOperation {
            details: format!("{details}: {op}"),
        };

        let obj = op.as_object().ok_or_else(|| malformed("not an object"))?;
        let path = obj
            .get("p")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("missing path"))?;
        if path.len() != 2 || path[0] != json!("record") {
            return Err(malformed("unexpected path"));
        }
        let field_id = path[1]
            .as_str()
            .ok_or_else(|| malformed("path field id is not a string"))?
            .to_string();
        let new_value = obj
            .get("oi")
            .cloned()
            .ok_or_else(|| malformed("missing insert value"))?;
        let old_value = obj.get("od").cloned().unwrap_or(Value::Null);

        Ok(FieldOp {
            field_id,
            old_value,
            new_value,
        })
    }
}

/// Collapse multiple changes for the same (table, record, field) into one.
///
/// The earliest old value and the latest new value survive, so the merged
/// change describes the net transition. Output order is stable on first
/// appearance.
pub fn merge_duplicate_changes(changes: Vec<CellChange>) -> Vec<CellChange> {
    let mut merged: Vec<CellChange> = Vec::with_capacity(changes.len());
    let mut index: HashMap<(String, String, String), usize> = HashMap::new();

    for change in changes {
        let key = (
            change.table_id.clone(),
            change.record_id.clone(),
            change.field_id.clone(),
        );
        match index.get(&key) {
            Some(&pos) => merged[pos].new_value = change.new_value,
            None => {
                index.insert(key, merged.len());
                merged.push(change);
            }
        }
    }

    merged
}

/// Group merged changes into the per-table, per-record ops map.
///
/// Records with zero changes never appear; callers should merge duplicates
/// first so each (record, field) yields exactly one operation.
pub fn changes_to_ops_map(changes: &[CellChange]) -> OpsMap {
    let mut ops_map = OpsMap::new();

    for change in changes {
        let op = FieldOp {
            field_id: change.field_id.clone(),
            old_value: change.old_value.clone(),
            new_value: change.new_value.clone(),
        };
        ops_map
            .entry(change.table_id.clone())
            .or_default()
            .entry(change.record_id.clone())
            .or_default()
            .push(op.encode());
    }

    ops_map
}

/// Metadata block of a change-log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOpMeta {
    /// Wall-clock timestamp, epoch milliseconds
    pub ts: i64,
}

/// One append-only change-log entry for a single record.
///
/// Field names are the persisted wire shape and must stay stable:
/// `{ src, seq, op, v, m: { ts }, c?, d? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOp {
    pub src: String,
    pub seq: u64,
    pub op: Vec<Value>,
    /// Pre-write record version
    pub v: u64,
    pub m: RawOpMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

#[cfg(test)]
#[path = "ops_test.rs"]
mod tests;
