//! cf-store - Table access abstraction for Cellflow
//!
//! Defines the [`TableStore`] trait the calculation engine reads and writes
//! through, plus [`MemoryStore`], an in-memory reference backend.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use traits::{ChangeLogEntry, LinkRow, RecordRow, RecordUpdate, TableStore, TableUpdate};
