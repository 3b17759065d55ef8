//! Calculation engine composition root
//!
//! [`CalculationEngine`] wires the pipeline together: dependency closure from
//! the [`GraphSource`], per-seed topological orders, origin location,
//! affected/dependent expansion, batched loading, change collection, and
//! batched persistence. One [`CalculationEngine::calculate_fields`] call is
//! one logical unit of work; the caller owns the enclosing transaction scope
//! and must serialize invocations against the same records.

use crate::collect;
use crate::compute::ValueComputer;
use crate::error::EngineResult;
use crate::expand::{self, RecordRefItem};
use crate::graph_source::GraphSource;
use crate::loader;
use crate::origin::{self, RecordRef};
use crate::persist;
use crate::snapshot::SchemaSnapshot;
use cf_core::{changes_to_ops_map, merge_duplicate_changes, FieldGraph, OpsMap, RawOpMap, TopoItem};
use cf_store::TableStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Persistence identity configuration.
///
/// The change-log sequence number and actor vary per writer in a multi-writer
/// deployment; the defaults match the single-writer setup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Actor recorded in last-modified metadata and change-log rows
    pub actor: String,
    /// Sequence number stamped on every RawOp of a batch
    pub seq: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            actor: "admin".to_string(),
            seq: 1,
        }
    }
}

/// Output of the read-and-compute half of the pipeline, ready to persist
pub struct PreparedOps {
    pub ops_map: OpsMap,
    pub snapshot: SchemaSnapshot,
}

/// The calculation engine
pub struct CalculationEngine {
    graph_source: Arc<dyn GraphSource>,
    computer: Arc<dyn ValueComputer>,
    config: EngineConfig,
}

impl CalculationEngine {
    pub fn new(graph_source: Arc<dyn GraphSource>, computer: Arc<dyn ValueComputer>) -> Self {
        Self::with_config(graph_source, computer, EngineConfig::default())
    }

    pub fn with_config(
        graph_source: Arc<dyn GraphSource>,
        computer: Arc<dyn ValueComputer>,
        config: EngineConfig,
    ) -> Self {
        Self {
            graph_source,
            computer,
            config,
        }
    }

    /// Recompute everything dependent on `changed_field_ids` of `table_id`
    /// and persist the results.
    ///
    /// Returns `None` (not an error) when there is nothing to do: no changed
    /// fields, no computed field in the closure, or no value actually
    /// changed. Returns the written RawOps per (table, record) otherwise.
    pub async fn calculate_fields(
        &self,
        store: &dyn TableStore,
        src: &str,
        table_id: &str,
        changed_field_ids: &[String],
    ) -> EngineResult<Option<RawOpMap>> {
        let started = Instant::now();

        let Some(prepared) = self.changed_ops_map(store, table_id, changed_field_ids).await?
        else {
            return Ok(None);
        };

        let raw_op_map =
            persist::batch_save(store, &self.config, src, &prepared.ops_map, &prepared.snapshot)
                .await?;

        log::debug!(
            "calculate_fields: table={} seeds={} in {:?}",
            table_id,
            changed_field_ids.len(),
            started.elapsed()
        );
        Ok(Some(raw_op_map))
    }

    /// The read-and-compute half: returns the deduplicated ops map and the
    /// schema snapshot it was computed under, or `None` for a no-op outcome.
    pub async fn changed_ops_map(
        &self,
        store: &dyn TableStore,
        table_id: &str,
        changed_field_ids: &[String],
    ) -> EngineResult<Option<PreparedOps>> {
        if changed_field_ids.is_empty() {
            return Ok(None);
        }
        let started = Instant::now();

        let edges = self.graph_source.dependent_graph(changed_field_ids).await?;
        let graph = FieldGraph::from_edges(&edges);

        let mut all_field_ids = graph.field_ids();
        for seed in changed_field_ids {
            if !all_field_ids.contains(seed) {
                all_field_ids.push(seed.clone());
            }
        }
        let snapshot = SchemaSnapshot::load(store, &all_field_ids).await?;

        let topo_orders = self.build_topo_orders(&graph, &snapshot, changed_field_ids)?;

        let mut origin_items: Vec<RecordRef> = Vec::new();
        let mut affected_items: Vec<RecordRefItem> = Vec::new();
        for (seed, order) in &topo_orders {
            let field = snapshot.field(seed)?;
            let origins = origin::origin_computed_records(store, table_id, &snapshot, field).await?;
            if origins.is_empty() {
                // Nothing to look up; the field is skipped for this pass.
                continue;
            }

            let hops = expand::link_hops(order, &snapshot)?;
            let items = expand::affected_record_items(store, &hops, &origins).await?;
            affected_items.extend(items);
            origin_items.extend(origins);
        }

        let dependent_items =
            expand::dependent_record_items(store, &snapshot, &affected_items).await?;

        let mut records = loader::load_record_batches(
            store,
            &origin_items,
            &affected_items,
            &dependent_items,
            &snapshot,
        )
        .await?;

        let mut changes = Vec::new();
        for (_, order) in &topo_orders {
            changes.extend(collect::collect_changes(
                order,
                &snapshot,
                self.computer.as_ref(),
                &mut records,
                &origin_items,
                &affected_items,
            )?);
        }

        log::debug!(
            "changed_ops_map: table={} changes={} in {:?}",
            table_id,
            changes.len(),
            started.elapsed()
        );

        if changes.is_empty() {
            return Ok(None);
        }

        let merged = merge_duplicate_changes(changes);
        let ops_map = changes_to_ops_map(&merged);
        Ok(Some(PreparedOps { ops_map, snapshot }))
    }

    /// One topological order per distinct seed, with the seed's own link hop
    /// stripped from the head when the evaluation root is itself a link field
    /// (it supplies records, not a value to assign).
    fn build_topo_orders(
        &self,
        graph: &FieldGraph,
        snapshot: &SchemaSnapshot,
        changed_field_ids: &[String],
    ) -> EngineResult<Vec<(String, Vec<TopoItem>)>> {
        let mut seen = HashSet::new();
        let mut orders = Vec::new();

        for seed in changed_field_ids {
            if !seen.insert(seed.clone()) {
                continue;
            }
            let mut order = graph.topological_order(seed)?;
            if let Some(first) = order.first() {
                if snapshot.field(&first.field_id)?.is_link() {
                    order.remove(0);
                }
            }
            orders.push((seed.clone(), order));
        }

        Ok(orders)
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
