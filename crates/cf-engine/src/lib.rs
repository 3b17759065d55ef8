//! cf-engine - Cellflow calculation engine
//!
//! Orchestrates incremental recomputation of computed fields: given a set of
//! changed field ids, discovers every transitively dependent field, locates
//! the records whose stored values must be recalculated, recomputes them in
//! topological order, and persists the resulting cell changes with versioned
//! change-log entries through a [`cf_store::TableStore`].

pub mod collect;
pub mod compute;
pub mod engine;
pub mod error;
pub mod expand;
pub mod graph_source;
pub mod loader;
pub mod origin;
pub mod persist;
pub mod snapshot;
#[cfg(test)]
pub(crate) mod test_utils;

pub use compute::ValueComputer;
pub use engine::{CalculationEngine, EngineConfig, PreparedOps};
pub use error::{EngineError, EngineResult};
pub use expand::{LinkHop, RecordRefItem};
pub use graph_source::{GraphSource, StaticGraphSource};
pub use origin::RecordRef;
pub use snapshot::SchemaSnapshot;
