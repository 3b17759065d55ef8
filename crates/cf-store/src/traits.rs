//! Table store trait definition
//!
//! Every read and write is a parameterized logical operation; callers never
//! assemble queries. Reads are batched per physical table. All mutation goes
//! through the single [`TableStore::apply`] call, which must be atomic:
//! either every row update and change-log entry lands, or none does.
//!
//! The trait is invoked inside one logical transaction scope supplied by the
//! caller; concurrent invocations against the same records must be serialized
//! by the caller.

use crate::error::StoreResult;
use async_trait::async_trait;
use cf_core::FieldDescriptor;
use serde_json::Value;
use std::collections::HashMap;

/// One record row keyed by physical column name.
///
/// Columns absent from the row read as JSON null.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub id: String,
    pub fields: HashMap<String, Value>,
}

/// A (row id, key-column value) pair from a foreign-key join read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRow {
    pub id: String,
    pub key: String,
}

/// New column values for one record, with the post-write version and
/// last-modified stamps.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub record_id: String,
    /// Physical column name -> new stored value
    pub columns: HashMap<String, Value>,
    /// New version (pre-write version + 1)
    pub version: u64,
    /// Epoch milliseconds
    pub last_modified_time: i64,
    pub last_modified_by: String,
}

/// All row updates for one physical table
#[derive(Debug, Clone, PartialEq)]
pub struct TableUpdate {
    pub table_name: String,
    pub updates: Vec<RecordUpdate>,
}

/// One append-only change-log row
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeLogEntry {
    /// Logical table id
    pub collection: String,
    /// Record id
    pub doc_id: String,
    /// Post-write record version
    pub version: u64,
    /// Serialized RawOp
    pub operation: Value,
    pub created_by: String,
}

/// Table access abstraction for Cellflow
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Load field definitions for the given field ids
    async fn field_descriptors(&self, field_ids: &[String]) -> StoreResult<Vec<FieldDescriptor>>;

    /// Resolve logical table ids to physical table names
    async fn table_names(&self, table_ids: &[String]) -> StoreResult<HashMap<String, String>>;

    /// All record ids of a table
    async fn record_ids(&self, table: &str) -> StoreResult<Vec<String>>;

    /// Distinct non-null values of a key column
    async fn non_null_key_values(&self, table: &str, key_column: &str) -> StoreResult<Vec<String>>;

    /// Ids of rows whose key column is non-null
    async fn non_null_key_records(&self, table: &str, key_column: &str)
        -> StoreResult<Vec<String>>;

    /// Rows whose key column matches one of `key_values`, as (id, key) pairs
    async fn rows_referencing(
        &self,
        table: &str,
        key_column: &str,
        key_values: &[String],
    ) -> StoreResult<Vec<LinkRow>>;

    /// Key-column value for each of the given rows, skipping null keys
    async fn record_keys(
        &self,
        table: &str,
        key_column: &str,
        record_ids: &[String],
    ) -> StoreResult<Vec<LinkRow>>;

    /// Batched row read: the requested columns of the given records.
    /// One call covers one physical table.
    async fn read_records(
        &self,
        table: &str,
        record_ids: &[String],
        columns: &[String],
    ) -> StoreResult<Vec<RecordRow>>;

    /// Current version numbers of the given records
    async fn record_versions(
        &self,
        table: &str,
        record_ids: &[String],
    ) -> StoreResult<HashMap<String, u64>>;

    /// Atomically apply all row updates and append all change-log entries
    async fn apply(
        &self,
        updates: &[TableUpdate],
        log_entries: &[ChangeLogEntry],
    ) -> StoreResult<()>;

    /// Store type identifier for logging
    fn store_type(&self) -> &'static str;
}
