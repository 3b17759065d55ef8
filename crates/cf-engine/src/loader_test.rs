use super::*;
use crate::test_utils::{formula_field, lookup_field, plain_field};
use cf_core::Relationship;
use cf_store::MemoryStore;
use serde_json::{json, Value};

fn cells(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

async fn fixture() -> (MemoryStore, SchemaSnapshot) {
    let store = MemoryStore::new();
    store.register_table("tbl1", "t1").unwrap();
    store.register_table("tbl2", "t2").unwrap();
    store.register_field(plain_field("fldA", "tbl1", "a")).unwrap();
    store.register_field(formula_field("fldB", "tbl1", "b")).unwrap();
    store
        .register_field(lookup_field(
            "fldC",
            "tbl2",
            "c",
            Relationship::ManyToOne,
            "tbl1",
            "t1_ref",
            "fldA",
        ))
        .unwrap();

    store
        .insert_row("t1", "r1", 0, cells(&[("a", json!(5.0)), ("b", json!(8.0))]))
        .unwrap();
    store
        .insert_row("t2", "x1", 0, cells(&[("t1_ref", json!("r1")), ("c", json!(5.0))]))
        .unwrap();

    let ids: Vec<String> = ["fldA", "fldB", "fldC"].iter().map(|s| s.to_string()).collect();
    let snapshot = SchemaSnapshot::load(&store, &ids).await.unwrap();
    (store, snapshot)
}

#[tokio::test]
async fn test_one_read_per_table_keyed_by_id() {
    let (store, snapshot) = fixture().await;
    let origins = vec![RecordRef::new("t1", "r1")];
    let affected = vec![RecordRefItem {
        table_name: "t2".to_string(),
        id: "x1".to_string(),
        field_id: Some("fldC".to_string()),
        relation_to: Some("r1".to_string()),
    }];

    let records = load_record_batches(&store, &origins, &affected, &[], &snapshot)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records["t1"]["r1"].fields["a"], json!(5.0));
    assert_eq!(records["t2"]["x1"].fields["t1_ref"], json!("r1"));
}

#[tokio::test]
async fn test_duplicate_refs_collapse() {
    let (store, snapshot) = fixture().await;
    let origins = vec![RecordRef::new("t1", "r1"), RecordRef::new("t1", "r1")];

    let records = load_record_batches(&store, &origins, &[], &[], &snapshot)
        .await
        .unwrap();

    assert_eq!(records["t1"].len(), 1);
}

#[tokio::test]
async fn test_empty_ref_sets_skip_all_reads() {
    let (store, snapshot) = fixture().await;
    let records = load_record_batches(&store, &[], &[], &[], &snapshot)
        .await
        .unwrap();
    assert!(records.is_empty());
}
