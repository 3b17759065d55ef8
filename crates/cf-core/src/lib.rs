//! cf-core - Core library for Cellflow
//!
//! This crate provides the field schema model, the field dependency graph
//! with per-seed topological ordering, and the cell-change / change-log
//! operation model shared across all Cellflow components.

pub mod error;
pub mod field;
pub mod graph;
pub mod ops;

pub use error::{CoreError, CoreResult};
pub use field::{DbColumnType, FieldDescriptor, FieldType, LookupSpec, Relationship};
pub use graph::{FieldGraph, GraphEdge, TopoItem};
pub use ops::{
    changes_to_ops_map, merge_duplicate_changes, CellChange, FieldOp, OpsMap, RawOp, RawOpMap,
    RawOpMeta,
};
