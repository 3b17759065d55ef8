//! Affected and dependent record-set expansion
//!
//! Walks the link hops of a topological order outward from the origin
//! records: each hop joins the current frontier through its relationship to
//! find every record of the next table that transitively references it. A
//! second pass resolves the dependent records, which are read to supply
//! values into affected formulas but never written.

use crate::error::{EngineError, EngineResult};
use crate::origin::RecordRef;
use crate::snapshot::SchemaSnapshot;
use cf_core::{Relationship, TopoItem};
use cf_store::TableStore;
use std::collections::{BTreeMap, HashSet};

/// One link hop of a topological order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHop {
    pub field_id: String,
    /// Physical table of the field that owns the hop
    pub table_name: String,
    pub relationship: Relationship,
    /// Physical table on the other side of the relationship
    pub foreign_table_name: String,
    pub foreign_key_column: String,
}

/// A record reference produced during expansion, tagged with the link field
/// that reached it and (for key-holding joins) the id it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRefItem {
    pub table_name: String,
    pub id: String,
    pub field_id: Option<String>,
    pub relation_to: Option<String>,
}

/// Extract the link hops of a topological order, in evaluation order
pub fn link_hops(topo_order: &[TopoItem], snapshot: &SchemaSnapshot) -> EngineResult<Vec<LinkHop>> {
    let mut hops = Vec::new();

    for item in topo_order {
        let field = snapshot.field(&item.field_id)?;
        let Some(lookup) = &field.lookup else {
            continue;
        };
        match lookup.relationship {
            Relationship::ManyToOne | Relationship::OneToMany => {}
            Relationship::OneToOne | Relationship::ManyToMany => {
                return Err(EngineError::InvalidRelationship {
                    field_id: field.id.clone(),
                });
            }
        }
        hops.push(LinkHop {
            field_id: field.id.clone(),
            table_name: snapshot.table_name(&field.table_id)?.to_string(),
            relationship: lookup.relationship,
            foreign_table_name: snapshot.table_name(&lookup.foreign_table_id)?.to_string(),
            foreign_key_column: lookup.foreign_key_column.clone(),
        });
    }

    Ok(hops)
}

/// Walk the hops outward from `origins`, accumulating every record whose
/// stored value is reachable through the link graph. Each hop's output is the
/// next hop's frontier.
pub async fn affected_record_items(
    store: &dyn TableStore,
    hops: &[LinkHop],
    origins: &[RecordRef],
) -> EngineResult<Vec<RecordRefItem>> {
    let mut affected: Vec<RecordRefItem> = Vec::new();
    let mut frontier: Vec<RecordRefItem> = origins
        .iter()
        .map(|r| RecordRefItem {
            table_name: r.table_name.clone(),
            id: r.id.clone(),
            field_id: None,
            relation_to: None,
        })
        .collect();

    for hop in hops {
        let source_ids = distinct_ids(&frontier, &hop.foreign_table_name);
        if source_ids.is_empty() {
            frontier.clear();
            continue;
        }

        let items = match hop.relationship {
            Relationship::ManyToOne => {
                // The hop's table holds the key; find its rows referencing
                // the frontier.
                let rows = store
                    .rows_referencing(&hop.table_name, &hop.foreign_key_column, &source_ids)
                    .await?;
                rows.into_iter()
                    .map(|row| RecordRefItem {
                        table_name: hop.table_name.clone(),
                        id: row.id,
                        field_id: Some(hop.field_id.clone()),
                        relation_to: Some(row.key),
                    })
                    .collect::<Vec<_>>()
            }
            Relationship::OneToMany => {
                // The frontier rows hold the key; the referenced rows of the
                // hop's table are affected.
                let rows = store
                    .record_keys(&hop.foreign_table_name, &hop.foreign_key_column, &source_ids)
                    .await?;
                let mut seen = HashSet::new();
                rows.into_iter()
                    .filter(|row| seen.insert(row.key.clone()))
                    .map(|row| RecordRefItem {
                        table_name: hop.table_name.clone(),
                        id: row.key,
                        field_id: Some(hop.field_id.clone()),
                        relation_to: None,
                    })
                    .collect()
            }
            Relationship::OneToOne | Relationship::ManyToMany => {
                return Err(EngineError::InvalidRelationship {
                    field_id: hop.field_id.clone(),
                });
            }
        };

        affected.extend(items.iter().cloned());
        frontier = items;
    }

    Ok(affected)
}

/// Resolve the records that must be read (not written) to recompute the
/// affected set: every key-holding row feeding a one-to-many aggregation,
/// and the referenced side of each many-to-one join.
pub async fn dependent_record_items(
    store: &dyn TableStore,
    snapshot: &SchemaSnapshot,
    affected: &[RecordRefItem],
) -> EngineResult<Vec<RecordRefItem>> {
    let mut by_field: BTreeMap<&str, Vec<&RecordRefItem>> = BTreeMap::new();
    for item in affected {
        if let Some(field_id) = &item.field_id {
            by_field.entry(field_id.as_str()).or_default().push(item);
        }
    }

    let mut dependent: Vec<RecordRefItem> = Vec::new();
    for (field_id, items) in by_field {
        let field = snapshot.field(field_id)?;
        let Some(lookup) = &field.lookup else {
            continue;
        };
        let foreign_table = snapshot.table_name(&lookup.foreign_table_id)?;

        match lookup.relationship {
            Relationship::OneToMany => {
                let mut ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
                ids.dedup();
                let rows = store
                    .rows_referencing(foreign_table, &lookup.foreign_key_column, &ids)
                    .await?;
                dependent.extend(rows.into_iter().map(|row| RecordRefItem {
                    table_name: foreign_table.to_string(),
                    id: row.id,
                    field_id: Some(field_id.to_string()),
                    relation_to: Some(row.key),
                }));
            }
            Relationship::ManyToOne => {
                let mut seen = HashSet::new();
                dependent.extend(
                    items
                        .iter()
                        .filter_map(|i| i.relation_to.clone())
                        .filter(|key| seen.insert(key.clone()))
                        .map(|key| RecordRefItem {
                            table_name: foreign_table.to_string(),
                            id: key,
                            field_id: Some(field_id.to_string()),
                            relation_to: None,
                        }),
                );
            }
            Relationship::OneToOne | Relationship::ManyToMany => {
                return Err(EngineError::InvalidRelationship {
                    field_id: field_id.to_string(),
                });
            }
        }
    }

    Ok(dependent)
}

fn distinct_ids(items: &[RecordRefItem], table_name: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|i| i.table_name == table_name)
        .filter(|i| seen.insert(i.id.clone()))
        .map(|i| i.id.clone())
        .collect()
}

#[cfg(test)]
#[path = "expand_test.rs"]
mod tests;
