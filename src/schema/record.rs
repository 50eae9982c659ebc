//! Validated records and their raw input form

use super::{Schema, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;

/// Unvalidated field input, in the order it was supplied.
///
/// [`RawRecord::set`] replaces an earlier value for the same field; collecting
/// from an iterator keeps every pair so [`Schema::validate`] can reject
/// repeated fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pairs: Vec<(String, Value)>,
}

impl RawRecord {
    /// Create an empty raw record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value, replacing any earlier value for the same field
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Set a field value in place
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((field, value)),
        }
    }

    /// Number of supplied fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no field was supplied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Consume into `(field, value)` pairs
    pub fn into_pairs(self) -> impl Iterator<Item = (String, Value)> {
        self.pairs.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One validated row conforming to a [`Schema`].
///
/// Values are held in schema field order. Records are immutable; a "closed"
/// account is a new record with its optional closing field set.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Record {
    pub(crate) fn from_parts(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(schema.fields().len(), values.len());
        Self { schema, values }
    }

    /// Schema the record conforms to
    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Values in schema field order
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of a field by name
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.schema.index_of(field).map(|idx| &self.values[idx])
    }

    /// Value of the identifier field, if the schema declares one
    #[must_use]
    pub fn identifier(&self) -> Option<&Value> {
        self.schema.identifier().and_then(|id| self.get(id))
    }

    /// Convert back into raw input (useful for re-validation against another schema)
    #[must_use]
    pub fn to_raw(&self) -> RawRecord {
        self.schema
            .field_names()
            .zip(self.values.iter().cloned())
            .collect()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.schema, &other.schema) || self.schema == other.schema)
            && self.values == other.values
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.schema.field_names().zip(&self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
