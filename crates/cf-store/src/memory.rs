//! In-memory table store backend
//!
//! Reference implementation of [`TableStore`] used by tests and embedders
//! that keep their record store in process. Rows live under one mutex; the
//! [`TableStore::apply`] contract is met by validating the whole batch before
//! mutating anything.

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    ChangeLogEntry, LinkRow, RecordRow, TableStore, TableUpdate,
};
use async_trait::async_trait;
use cf_core::FieldDescriptor;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct StoredRow {
    version: u64,
    last_modified_time: Option<i64>,
    last_modified_by: Option<String>,
    cells: HashMap<String, Value>,
}

#[derive(Debug, Default)]
struct Inner {
    /// field id -> descriptor
    schema: HashMap<String, FieldDescriptor>,
    /// logical table id -> physical table name
    table_names: HashMap<String, String>,
    /// physical table name -> record id -> row
    tables: BTreeMap<String, BTreeMap<String, StoredRow>>,
    change_log: Vec<ChangeLogEntry>,
}

/// In-memory store backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| StoreError::MutexPoisoned(e.to_string()))
    }

    /// Register a logical table and its physical name, creating empty storage
    pub fn register_table(&self, table_id: &str, table_name: &str) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner
            .table_names
            .insert(table_id.to_string(), table_name.to_string());
        inner.tables.entry(table_name.to_string()).or_default();
        Ok(())
    }

    /// Register a field definition
    pub fn register_field(&self, field: FieldDescriptor) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.schema.insert(field.id.clone(), field);
        Ok(())
    }

    /// Insert a row with the given starting version and cell values
    pub fn insert_row(
        &self,
        table: &str,
        record_id: &str,
        version: u64,
        cells: HashMap<String, Value>,
    ) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let rows = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        rows.insert(
            record_id.to_string(),
            StoredRow {
                version,
                cells,
                ..Default::default()
            },
        );
        Ok(())
    }

    /// Current version of a record, if it exists (test accessor)
    pub fn row_version(&self, table: &str, record_id: &str) -> StoreResult<Option<u64>> {
        let inner = self.lock()?;
        Ok(inner
            .tables
            .get(table)
            .and_then(|rows| rows.get(record_id))
            .map(|row| row.version))
    }

    /// One stored cell value (test accessor)
    pub fn cell(&self, table: &str, record_id: &str, column: &str) -> StoreResult<Option<Value>> {
        let inner = self.lock()?;
        Ok(inner
            .tables
            .get(table)
            .and_then(|rows| rows.get(record_id))
            .and_then(|row| row.cells.get(column))
            .cloned())
    }

    /// Last-modified actor of a record (test accessor)
    pub fn last_modified_by(&self, table: &str, record_id: &str) -> StoreResult<Option<String>> {
        let inner = self.lock()?;
        Ok(inner
            .tables
            .get(table)
            .and_then(|rows| rows.get(record_id))
            .and_then(|row| row.last_modified_by.clone()))
    }

    /// Snapshot of the append-only change log
    pub fn change_log_entries(&self) -> StoreResult<Vec<ChangeLogEntry>> {
        let inner = self.lock()?;
        Ok(inner.change_log.clone())
    }

    fn key_of(row: &StoredRow, key_column: &str) -> Option<String> {
        match row.cells.get(key_column) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn field_descriptors(&self, field_ids: &[String]) -> StoreResult<Vec<FieldDescriptor>> {
        let inner = self.lock()?;
        field_ids
            .iter()
            .map(|id| {
                inner
                    .schema
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::FieldNotFound(id.clone()))
            })
            .collect()
    }

    async fn table_names(&self, table_ids: &[String]) -> StoreResult<HashMap<String, String>> {
        let inner = self.lock()?;
        table_ids
            .iter()
            .map(|id| {
                inner
                    .table_names
                    .get(id)
                    .map(|name| (id.clone(), name.clone()))
                    .ok_or_else(|| StoreError::TableNotFound(id.clone()))
            })
            .collect()
    }

    async fn record_ids(&self, table: &str) -> StoreResult<Vec<String>> {
        let inner = self.lock()?;
        let rows = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        Ok(rows.keys().cloned().collect())
    }

    async fn non_null_key_values(&self, table: &str, key_column: &str) -> StoreResult<Vec<String>> {
        let inner = self.lock()?;
        let rows = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for row in rows.values() {
            if let Some(key) = Self::key_of(row, key_column) {
                if seen.insert(key.clone()) {
                    values.push(key);
                }
            }
        }
        Ok(values)
    }

    async fn non_null_key_records(
        &self,
        table: &str,
        key_column: &str,
    ) -> StoreResult<Vec<String>> {
        let inner = self.lock()?;
        let rows = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        Ok(rows
            .iter()
            .filter(|(_, row)| Self::key_of(row, key_column).is_some())
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn rows_referencing(
        &self,
        table: &str,
        key_column: &str,
        key_values: &[String],
    ) -> StoreResult<Vec<LinkRow>> {
        let inner = self.lock()?;
        let rows = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        let wanted: HashSet<&String> = key_values.iter().collect();
        Ok(rows
            .iter()
            .filter_map(|(id, row)| {
                Self::key_of(row, key_column)
                    .filter(|key| wanted.contains(key))
                    .map(|key| LinkRow {
                        id: id.clone(),
                        key,
                    })
            })
            .collect())
    }

    async fn record_keys(
        &self,
        table: &str,
        key_column: &str,
        record_ids: &[String],
    ) -> StoreResult<Vec<LinkRow>> {
        let inner = self.lock()?;
        let rows = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        Ok(record_ids
            .iter()
            .filter_map(|id| {
                rows.get(id)
                    .and_then(|row| Self::key_of(row, key_column))
                    .map(|key| LinkRow {
                        id: id.clone(),
                        key,
                    })
            })
            .collect())
    }

    async fn read_records(
        &self,
        table: &str,
        record_ids: &[String],
        columns: &[String],
    ) -> StoreResult<Vec<RecordRow>> {
        let inner = self.lock()?;
        let rows = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        let mut result = Vec::with_capacity(record_ids.len());
        for id in record_ids {
            let Some(row) = rows.get(id) else {
                continue;
            };
            let fields = columns
                .iter()
                .map(|col| {
                    let value = row.cells.get(col).cloned().unwrap_or(Value::Null);
                    (col.clone(), value)
                })
                .collect();
            result.push(RecordRow {
                id: id.clone(),
                fields,
            });
        }
        Ok(result)
    }

    async fn record_versions(
        &self,
        table: &str,
        record_ids: &[String],
    ) -> StoreResult<HashMap<String, u64>> {
        let inner = self.lock()?;
        let rows = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        record_ids
            .iter()
            .map(|id| {
                rows.get(id)
                    .map(|row| (id.clone(), row.version))
                    .ok_or_else(|| StoreError::RecordNotFound {
                        table: table.to_string(),
                        record_id: id.clone(),
                    })
            })
            .collect()
    }

    async fn apply(
        &self,
        updates: &[TableUpdate],
        log_entries: &[ChangeLogEntry],
    ) -> StoreResult<()> {
        let mut inner = self.lock()?;

        // Validate the whole batch before touching any row, so a failed
        // apply leaves the store unchanged.
        for table_update in updates {
            let rows = inner
                .tables
                .get(&table_update.table_name)
                .ok_or_else(|| StoreError::TableNotFound(table_update.table_name.clone()))?;
            for update in &table_update.updates {
                if !rows.contains_key(&update.record_id) {
                    return Err(StoreError::RecordNotFound {
                        table: table_update.table_name.clone(),
                        record_id: update.record_id.clone(),
                    });
                }
            }
        }

        for table_update in updates {
            let rows = inner
                .tables
                .get_mut(&table_update.table_name)
                .expect("validated above");
            for update in &table_update.updates {
                let row = rows.get_mut(&update.record_id).expect("validated above");
                row.version = update.version;
                row.last_modified_time = Some(update.last_modified_time);
                row.last_modified_by = Some(update.last_modified_by.clone());
                for (column, value) in &update.columns {
                    row.cells.insert(column.clone(), value.clone());
                }
            }
        }

        inner.change_log.extend(log_entries.iter().cloned());
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
