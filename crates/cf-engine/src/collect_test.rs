use super::*;
use crate::loader::load_record_batches;
use crate::snapshot::SchemaSnapshot;
use crate::test_utils::{formula_field, lookup_field, plain_field, TestComputer};
use cf_store::MemoryStore;
use serde_json::json;
use std::collections::HashMap;

fn cells(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn item(field_id: &str, deps: &[&str]) -> TopoItem {
    TopoItem {
        field_id: field_id.to_string(),
        dependencies: deps.iter().map(|s| s.to_string()).collect(),
    }
}

async fn self_table_fixture() -> (MemoryStore, SchemaSnapshot) {
    let store = MemoryStore::new();
    store.register_table("tbl1", "t1").unwrap();
    store.register_field(plain_field("fldA", "tbl1", "a")).unwrap();
    store.register_field(formula_field("fldB", "tbl1", "b")).unwrap();
    store
        .insert_row("t1", "r1", 3, cells(&[("a", json!(5.0)), ("b", json!(8.0))]))
        .unwrap();
    store
        .insert_row("t1", "r2", 0, cells(&[("a", json!(7.0)), ("b", json!(14.0))]))
        .unwrap();

    let ids: Vec<String> = ["fldA", "fldB"].iter().map(|s| s.to_string()).collect();
    let snapshot = SchemaSnapshot::load(&store, &ids).await.unwrap();
    (store, snapshot)
}

#[tokio::test]
async fn test_emits_change_only_on_differing_value() {
    let (store, snapshot) = self_table_fixture().await;
    let origins = vec![RecordRef::new("t1", "r1"), RecordRef::new("t1", "r2")];
    let mut records = load_record_batches(&store, &origins, &[], &[], &snapshot)
        .await
        .unwrap();

    let order = vec![item("fldA", &[]), item("fldB", &["fldA"])];
    let changes = collect_changes(
        &order,
        &snapshot,
        &TestComputer,
        &mut records,
        &origins,
        &[],
    )
    .unwrap();

    // r1: 5*2 = 10 != 8 -> change; r2: 7*2 = 14 == stored -> no change.
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].record_id, "r1");
    assert_eq!(changes[0].field_id, "fldB");
    assert_eq!(changes[0].old_value, json!(8.0));
    assert_eq!(changes[0].new_value, json!(10.0));
}

#[tokio::test]
async fn test_plain_fields_are_not_recomputed() {
    let (store, snapshot) = self_table_fixture().await;
    let origins = vec![RecordRef::new("t1", "r1")];
    let mut records = load_record_batches(&store, &origins, &[], &[], &snapshot)
        .await
        .unwrap();

    let changes = collect_changes(
        &[item("fldA", &[])],
        &snapshot,
        &TestComputer,
        &mut records,
        &origins,
        &[],
    )
    .unwrap();
    assert!(changes.is_empty());
}

#[tokio::test]
async fn test_downstream_sees_fresh_upstream_value() {
    // fldD rolls up fldC values; fldC is recomputed first in the same pass,
    // so the rollup must see the fresh value, not the stored one.
    let store = MemoryStore::new();
    store.register_table("tbl1", "t1").unwrap();
    store.register_table("tbl2", "t2").unwrap();
    store.register_field(plain_field("fldA", "tbl1", "a")).unwrap();
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
        .register_field(lookup_field(
            "fldD",
            "tbl1",
            "d",
            Relationship::OneToMany,
            "tbl2",
            "t1_ref",
            "fldC",
        ))
        .unwrap();

    store
        .insert_row(
            "t1",
            "r1",
            0,
            cells(&[("a", json!(6.0)), ("d", json!(4.0))]),
        )
        .unwrap();
    // Stored c is stale (2.0); fresh value is a = 6.0.
    store
        .insert_row(
            "t2",
            "x1",
            0,
            cells(&[("t1_ref", json!("r1")), ("c", json!(2.0))]),
        )
        .unwrap();

    let ids: Vec<String> = ["fldA", "fldC", "fldD"].iter().map(|s| s.to_string()).collect();
    let snapshot = SchemaSnapshot::load(&store, &ids).await.unwrap();

    let origins = vec![RecordRef::new("t1", "r1")];
    let affected = vec![
        RecordRefItem {
            table_name: "t2".to_string(),
            id: "x1".to_string(),
            field_id: Some("fldC".to_string()),
            relation_to: Some("r1".to_string()),
        },
        RecordRefItem {
            table_name: "t1".to_string(),
            id: "r1".to_string(),
            field_id: Some("fldD".to_string()),
            relation_to: None,
        },
    ];
    let mut records = load_record_batches(&store, &origins, &affected, &[], &snapshot)
        .await
        .unwrap();

    let order = vec![
        item("fldA", &[]),
        item("fldC", &["fldA"]),
        item("fldD", &["fldC"]),
    ];
    let changes = collect_changes(
        &order,
        &snapshot,
        &TestComputer,
        &mut records,
        &origins,
        &affected,
    )
    .unwrap();

    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].field_id, "fldC");
    assert_eq!(changes[0].new_value, json!(6.0));
    // The rollup summed the fresh 6.0, not the stale 2.0.
    assert_eq!(changes[1].field_id, "fldD");
    assert_eq!(changes[1].new_value, json!(6.0));
}

#[tokio::test]
async fn test_unloaded_records_are_skipped() {
    let (store, snapshot) = self_table_fixture().await;
    let origins = vec![RecordRef::new("t1", "ghost")];
    let mut records = load_record_batches(&store, &origins, &[], &[], &snapshot)
        .await
        .unwrap();

    let changes = collect_changes(
        &[item("fldB", &["fldA"])],
        &snapshot,
        &TestComputer,
        &mut records,
        &origins,
        &[],
    )
    .unwrap();
    assert!(changes.is_empty());
}
