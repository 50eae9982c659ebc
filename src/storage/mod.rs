//! Durable record stores
//!
//! **Append-Only Write Pattern**:
//! - Records are validated once, on the way in, and never mutated afterwards
//! - Every append rewrites the whole collection atomically (temp file + rename)
//! - Readers always observe either the previous or the updated collection
//!
//! Writers are serialized per path by an exclusive guard held for the whole
//! read-modify-write; the guard is released on every exit path.
//!
//! # Example
//!
//! ```rust
//! use ledger_insight::schema::{catalog, RawRecord};
//! use ledger_insight::storage::{CsvRecordStore, RecordStore};
//!
//! # fn main() -> ledger_insight::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let store = CsvRecordStore::open(dir.path().join("insurance_data.csv"), catalog::insurance());
//! assert!(store.load().is_empty()); // first run: no file yet
//!
//! store.append_raw(
//!     RawRecord::new()
//!         .set("Name", "Kiran")
//!         .set("Age", 51)
//!         .set("Health_Risk_Score", 4.2)
//!         .set("Premium_Amount", 900.0)
//!         .set("Claim_Amount", 150.0),
//! )?;
//! assert_eq!(store.load().len(), 1);
//! # Ok(())
//! # }
//! ```

mod csv;
mod memory;

pub use self::csv::{decode_csv, encode_csv, CsvRecordStore};
pub use memory::MemoryRecordStore;

use crate::dataset::Dataset;
use crate::schema::{IdentifierPolicy, RawRecord, Record, Schema};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::warn;

/// A durable collection of records of one kind.
///
/// Implementations must make [`append`](Self::append) atomic from the
/// caller's perspective and serialize concurrent appends.
pub trait RecordStore: Send + Sync {
    /// Schema every stored record conforms to
    fn schema(&self) -> &Arc<Schema>;

    /// Read the full collection, surfacing any storage error.
    ///
    /// An absent collection is not an error: it yields an empty dataset.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] (or a wrapped IO/Arrow error) if the
    /// collection exists but cannot be read or does not match the schema
    fn try_load(&self) -> Result<Dataset>;

    /// Read the full collection, degrading to an empty dataset on failure.
    ///
    /// "No data yet" is a legitimate session state, so unreadable storage is
    /// logged and treated as empty rather than failing the caller.
    fn load(&self) -> Dataset {
        match self.try_load() {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!(
                    kind = self.schema().name(),
                    error = %e,
                    "record store unreadable, continuing with an empty dataset"
                );
                Dataset::empty(Arc::clone(self.schema()))
            }
        }
    }

    /// Durably append one validated record.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] if the record belongs to another
    /// schema, [`Error::Validation`] if it repeats a unique identifier, and
    /// [`Error::Storage`] if the medium cannot be read or written
    fn append(&self, record: Record) -> Result<()>;

    /// Validate raw input, append it, and return the stored record.
    ///
    /// # Errors
    /// Returns the validation error or any error of [`append`](Self::append)
    fn append_raw(&self, raw: RawRecord) -> Result<Record> {
        let record = self.schema().validate(raw)?;
        self.append(record.clone())?;
        Ok(record)
    }
}

/// Reject records validated against a different schema
pub(crate) fn ensure_schema(schema: &Schema, record: &Record) -> Result<()> {
    if record.schema().as_ref() == schema {
        Ok(())
    } else {
        Err(Error::schema_mismatch(
            record.schema().name(),
            format!("record does not belong to store schema '{}'", schema.name()),
        ))
    }
}

/// Enforce the schema's identifier policy against the current collection
pub(crate) fn ensure_identifier_policy(current: &Dataset, record: &Record) -> Result<()> {
    let schema = current.schema();
    if schema.identifier_policy() != IdentifierPolicy::Unique {
        return Ok(());
    }
    let (Some(field), Some(id)) = (schema.identifier(), record.identifier()) else {
        return Ok(());
    };
    let Some(col) = schema.index_of(field) else {
        return Ok(());
    };
    if (0..current.len()).any(|row| current.value(row, col) == *id) {
        return Err(Error::validation(
            field,
            format!("identifier '{id}' already exists"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog;

    fn order(id: &str) -> RawRecord {
        RawRecord::new()
            .set("Order_ID", id)
            .set("Agent_Age", 30)
            .set("Order_Date", "2024-05-01")
            .set("Vehicle", "van")
            .set("Area", "Urban")
            .set("Delivery_Time", 45)
    }

    #[test]
    fn test_unique_identifier_rejected_by_every_backend() {
        let dir = tempfile::tempdir().unwrap();
        let stores: Vec<Box<dyn RecordStore>> = vec![
            Box::new(MemoryRecordStore::new(catalog::orders())),
            Box::new(CsvRecordStore::open(dir.path().join("orders.csv"), catalog::orders())),
        ];

        for store in &stores {
            store.append_raw(order("ORD-1")).unwrap();
            let err = store.append_raw(order("ORD-1")).unwrap_err();
            assert!(matches!(err, Error::Validation { ref field, .. } if field == "Order_ID"));
            assert_eq!(store.load().len(), 1);
        }
    }

    #[test]
    fn test_foreign_record_rejected() {
        let store = MemoryRecordStore::new(catalog::orders());
        let foreign = catalog::insurance()
            .validate(
                RawRecord::new()
                    .set("Name", "Zoya")
                    .set("Age", 33)
                    .set("Health_Risk_Score", 2.0)
                    .set("Premium_Amount", 100.0)
                    .set("Claim_Amount", 0.0),
            )
            .unwrap();
        assert!(matches!(store.append(foreign), Err(Error::SchemaMismatch { .. })));
    }
}
