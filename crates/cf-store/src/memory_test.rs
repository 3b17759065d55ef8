use super::*;
use crate::traits::RecordUpdate;
use serde_json::json;

fn cells(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.register_table("tbl1", "t1").unwrap();
    store.register_table("tbl2", "t2").unwrap();
    store
        .insert_row("t1", "r1", 3, cells(&[("a", json!(5.0)), ("b", json!(8.0))]))
        .unwrap();
    store
        .insert_row("t1", "r2", 0, cells(&[("a", json!(7.0))]))
        .unwrap();
    store
        .insert_row("t2", "x1", 1, cells(&[("t1_ref", json!("r1"))]))
        .unwrap();
    store
        .insert_row("t2", "x2", 1, cells(&[("t1_ref", Value::Null)]))
        .unwrap();
    store
}

#[tokio::test]
async fn test_record_ids() {
    let store = seeded_store();
    let ids = store.record_ids("t1").await.unwrap();
    assert_eq!(ids, vec!["r1".to_string(), "r2".to_string()]);
}

#[tokio::test]
async fn test_unknown_table_errors() {
    let store = seeded_store();
    assert!(matches!(
        store.record_ids("nope").await.unwrap_err(),
        StoreError::TableNotFound(_)
    ));
}

#[tokio::test]
async fn test_non_null_key_values_distinct() {
    let store = seeded_store();
    store
        .insert_row("t2", "x3", 1, cells(&[("t1_ref", json!("r1"))]))
        .unwrap();

    let values = store.non_null_key_values("t2", "t1_ref").await.unwrap();
    assert_eq!(values, vec!["r1".to_string()]);
}

#[tokio::test]
async fn test_non_null_key_records_skips_null_keys() {
    let store = seeded_store();
    let ids = store.non_null_key_records("t2", "t1_ref").await.unwrap();
    assert_eq!(ids, vec!["x1".to_string()]);
}

#[tokio::test]
async fn test_rows_referencing() {
    let store = seeded_store();
    let rows = store
        .rows_referencing("t2", "t1_ref", &["r1".to_string()])
        .await
        .unwrap();
    assert_eq!(
        rows,
        vec![LinkRow {
            id: "x1".to_string(),
            key: "r1".to_string()
        }]
    );
}

#[tokio::test]
async fn test_record_keys_skips_missing_and_null() {
    let store = seeded_store();
    let rows = store
        .record_keys(
            "t2",
            "t1_ref",
            &["x1".to_string(), "x2".to_string(), "ghost".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "x1");
}

#[tokio::test]
async fn test_read_records_fills_missing_columns_with_null() {
    let store = seeded_store();
    let rows = store
        .read_records("t1", &["r2".to_string()], &["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fields["a"], json!(7.0));
    assert_eq!(rows[0].fields["b"], Value::Null);
}

#[tokio::test]
async fn test_read_records_skips_unknown_ids() {
    let store = seeded_store();
    let rows = store
        .read_records("t1", &["ghost".to_string()], &["a".to_string()])
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_record_versions() {
    let store = seeded_store();
    let versions = store
        .record_versions("t1", &["r1".to_string(), "r2".to_string()])
        .await
        .unwrap();
    assert_eq!(versions["r1"], 3);
    assert_eq!(versions["r2"], 0);
}

#[tokio::test]
async fn test_apply_updates_rows_and_appends_log() {
    let store = seeded_store();

    let updates = vec![TableUpdate {
        table_name: "t1".to_string(),
        updates: vec![RecordUpdate {
            record_id: "r1".to_string(),
            columns: cells(&[("b", json!(10.0))]),
            version: 4,
            last_modified_time: 1700000000000,
            last_modified_by: "admin".to_string(),
        }],
    }];
    let log = vec![ChangeLogEntry {
        collection: "tbl1".to_string(),
        doc_id: "r1".to_string(),
        version: 4,
        operation: json!({"src": "s1"}),
        created_by: "admin".to_string(),
    }];

    store.apply(&updates, &log).await.unwrap();

    assert_eq!(store.cell("t1", "r1", "b").unwrap(), Some(json!(10.0)));
    assert_eq!(store.row_version("t1", "r1").unwrap(), Some(4));
    assert_eq!(
        store.last_modified_by("t1", "r1").unwrap(),
        Some("admin".to_string())
    );

    let entries = store.change_log_entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].doc_id, "r1");
    assert_eq!(entries[0].version, 4);
}

#[tokio::test]
async fn test_apply_is_all_or_nothing() {
    let store = seeded_store();

    let updates = vec![TableUpdate {
        table_name: "t1".to_string(),
        updates: vec![
            RecordUpdate {
                record_id: "r1".to_string(),
                columns: cells(&[("b", json!(99.0))]),
                version: 4,
                last_modified_time: 0,
                last_modified_by: "admin".to_string(),
            },
            RecordUpdate {
                record_id: "ghost".to_string(),
                columns: HashMap::new(),
                version: 1,
                last_modified_time: 0,
                last_modified_by: "admin".to_string(),
            },
        ],
    }];

    let result = store.apply(&updates, &[]).await;
    assert!(matches!(
        result.unwrap_err(),
        StoreError::RecordNotFound { .. }
    ));

    // Nothing landed: r1 is untouched and the log is empty.
    assert_eq!(store.cell("t1", "r1", "b").unwrap(), Some(json!(8.0)));
    assert_eq!(store.row_version("t1", "r1").unwrap(), Some(3));
    assert!(store.change_log_entries().unwrap().is_empty());
}
