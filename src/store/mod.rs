//! Durable experiment records.
//!
//! The run lifecycle only ever calls [`RecordStore::insert`] once and
//! [`RecordStore::update`] once per invocation. The query side (`get`,
//! `list`, `stats`, `delete`) backs the `labpilot` companion binary.

pub mod model;
pub mod sqlite;

pub use model::{ExperimentRecord, NewRun, RecordFilter, StoreStats, TerminalUpdate};
pub use sqlite::SqliteStore;

use crate::errors::Result;

/// Persistence contract for experiment records.
///
/// Implementations must assign monotonically increasing ids that are never
/// reused, and must tolerate other processes writing concurrently.
pub trait RecordStore: Send + Sync {
    /// Insert a new record and return its id.
    fn insert(&self, run: &NewRun) -> Result<i64>;

    /// Apply the terminal fields to an existing record.
    ///
    /// Fails with `RecordNotFound` if `id` does not exist.
    fn update(&self, id: i64, update: &TerminalUpdate) -> Result<()>;

    fn get(&self, id: i64) -> Result<Option<ExperimentRecord>>;

    /// Newest first, filtered and paginated.
    fn list(&self, filter: &RecordFilter) -> Result<Vec<ExperimentRecord>>;

    fn stats(&self) -> Result<StoreStats>;

    /// Hard delete. Fails with `RecordNotFound` if `id` does not exist.
    fn delete(&self, id: i64) -> Result<()>;
}
