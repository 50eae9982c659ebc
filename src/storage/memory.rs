//! In-memory record store.
//!
//! Data is lost on process restart. Useful for tests and ephemeral sessions;
//! for persistence use [`CsvRecordStore`](super::CsvRecordStore).

use super::{ensure_identifier_policy, ensure_schema, RecordStore};
use crate::dataset::Dataset;
use crate::schema::{Record, Schema};
use crate::Result;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// In-memory record store.
///
/// The collection lives behind a mutex; each append swaps in a new snapshot,
/// so datasets handed out earlier are never affected.
#[derive(Debug)]
pub struct MemoryRecordStore {
    schema: Arc<Schema>,
    dataset: Mutex<Dataset>,
}

impl MemoryRecordStore {
    /// Create an empty in-memory store
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        let dataset = Dataset::empty(Arc::clone(&schema));
        Self {
            schema,
            dataset: Mutex::new(dataset),
        }
    }

    /// Create a store seeded with an existing dataset
    #[must_use]
    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            schema: Arc::clone(dataset.schema()),
            dataset: Mutex::new(dataset),
        }
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.dataset.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryRecordStore {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn try_load(&self) -> Result<Dataset> {
        Ok(self
            .dataset
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn append(&self, record: Record) -> Result<()> {
        ensure_schema(&self.schema, &record)?;

        let mut current = self.dataset.lock().unwrap_or_else(PoisonError::into_inner);
        ensure_identifier_policy(&current, &record)?;
        *current = current.with_appended(&record)?;
        debug!(kind = self.schema.name(), rows = current.len(), "appended record in memory");
        Ok(())
    }
}
