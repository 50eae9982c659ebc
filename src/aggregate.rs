//! Group-by aggregation
//!
//! Rows are grouped by the observed combinations of the group-by fields and a
//! single value field is reduced per group. Output is ordered by ascending
//! group key.
//!
//! Null handling:
//! - a null group-by value is a key of its own, ordered before any other
//!   value, so every row lands in exactly one group
//! - `Sum` and `Mean` skip null values
//! - `Count` counts the rows of the group

use crate::dataset::Dataset;
use crate::schema::Value;
use crate::{Error, Result};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Reduction applied to the value field of each group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Number of rows in the group
    Count,
    /// Sum of the non-null values
    Sum,
    /// Arithmetic mean of the non-null values
    Mean,
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Mean => "mean",
        })
    }
}

/// What to group by and how to reduce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSpec {
    /// Grouping fields, in key order; empty means one group over all rows
    pub group_by: Vec<String>,
    /// Field being reduced
    pub value_field: String,
    /// Reduction applied per group
    pub reduction: Reduction,
}

impl AggregationSpec {
    /// Spec from parts
    #[must_use]
    pub fn new<I, S>(group_by: I, value_field: impl Into<String>, reduction: Reduction) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_by: group_by.into_iter().map(Into::into).collect(),
            value_field: value_field.into(),
            reduction,
        }
    }

    /// Mean of `value_field` per value of `group_field`
    #[must_use]
    pub fn mean_by(group_field: impl Into<String>, value_field: impl Into<String>) -> Self {
        Self::new([group_field.into()], value_field, Reduction::Mean)
    }

    /// Sum of `value_field` per value of `group_field`
    #[must_use]
    pub fn sum_by(group_field: impl Into<String>, value_field: impl Into<String>) -> Self {
        Self::new([group_field.into()], value_field, Reduction::Sum)
    }
}

/// Values of the group-by fields, in declared order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<Value>);

impl GroupKey {
    /// Key values
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl Borrow<[Value]> for GroupKey {
    fn borrow(&self) -> &[Value] {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.pad(&format!("({})", parts.join(", ")))
    }
}

/// Reduced value per group, in ascending key order
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    group_by: Vec<String>,
    value_field: String,
    reduction: Reduction,
    entries: BTreeMap<GroupKey, f64>,
}

impl AggregateTable {
    /// Grouping fields
    #[must_use]
    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// Reduced field
    #[must_use]
    pub fn value_field(&self) -> &str {
        &self.value_field
    }

    /// Reduction applied
    #[must_use]
    pub const fn reduction(&self) -> Reduction {
        self.reduction
    }

    /// Number of groups
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no group was observed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reduced value of the group with exactly these key values
    #[must_use]
    pub fn get(&self, key: &[Value]) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// Groups in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, f64)> + '_ {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    /// Group keys in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> + '_ {
        self.entries.keys()
    }

    /// Sum of all reduced values
    #[must_use]
    pub fn total(&self) -> f64 {
        self.entries.values().sum()
    }
}

#[derive(Serialize)]
struct Row<'a> {
    key: &'a GroupKey,
    value: f64,
}

// JSON maps need string keys, so groups serialize as a list of rows.
impl Serialize for AggregateTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let rows: Vec<Row<'_>> = self.iter().map(|(key, value)| Row { key, value }).collect();
        let mut s = serializer.serialize_struct("AggregateTable", 4)?;
        s.serialize_field("group_by", &self.group_by)?;
        s.serialize_field("value_field", &self.value_field)?;
        s.serialize_field("reduction", &self.reduction)?;
        s.serialize_field("rows", &rows)?;
        s.end()
    }
}

#[derive(Default)]
struct Accumulator {
    rows: usize,
    present: usize,
    sum: f64,
}

/// Group-and-reduce over datasets
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationEngine;

impl AggregationEngine {
    /// Group `dataset` and reduce the value field per group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if a field is unknown or a `Sum`/`Mean`
    /// targets a non-numeric field, and [`Error::Computation`] if a `Mean` has
    /// no non-null values to average (including an empty dataset)
    #[allow(clippy::cast_precision_loss)]
    pub fn reduce(dataset: &Dataset, spec: &AggregationSpec) -> Result<AggregateTable> {
        let schema = dataset.schema();
        let key_cols = spec
            .group_by
            .iter()
            .map(|name| schema.resolve(name).map(|(idx, _)| idx))
            .collect::<Result<Vec<_>>>()?;
        let (value_col, value_spec) = schema.resolve(&spec.value_field)?;
        if spec.reduction != Reduction::Count && !value_spec.kind().is_numeric() {
            return Err(Error::schema_mismatch(
                &spec.value_field,
                format!(
                    "{} needs a numeric field, found {}",
                    spec.reduction,
                    value_spec.kind().type_name()
                ),
            ));
        }

        let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
        let mut null_keyed = 0usize;
        for row in 0..dataset.len() {
            let key: Vec<Value> = key_cols.iter().map(|&col| dataset.value(row, col)).collect();
            if key.iter().any(Value::is_null) {
                null_keyed += 1;
            }
            let acc = groups.entry(GroupKey(key)).or_default();
            acc.rows += 1;
            if let Some(v) = dataset.numeric(row, value_col) {
                acc.present += 1;
                acc.sum += v;
            }
        }

        if spec.reduction == Reduction::Mean && groups.is_empty() {
            return Err(Error::Computation(format!(
                "mean of '{}' over an empty dataset is undefined",
                spec.value_field
            )));
        }

        let entries = groups
            .into_iter()
            .map(|(key, acc)| {
                let value = match spec.reduction {
                    Reduction::Count => acc.rows as f64,
                    Reduction::Sum => acc.sum,
                    Reduction::Mean if acc.present == 0 => {
                        return Err(Error::Computation(format!(
                            "mean of '{}' for group {key} has no values",
                            spec.value_field
                        )))
                    }
                    Reduction::Mean => acc.sum / acc.present as f64,
                };
                Ok((key, value))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        debug!(
            kind = schema.name(),
            reduction = %spec.reduction,
            value_field = %spec.value_field,
            groups = entries.len(),
            null_keyed_rows = null_keyed,
            "reduced dataset"
        );

        Ok(AggregateTable {
            group_by: spec.group_by.clone(),
            value_field: spec.value_field.clone(),
            reduction: spec.reduction,
            entries,
        })
    }

    /// Number of rows per distinct value of `field`; missing values count
    /// under the null key.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] if the field is unknown
    pub fn value_counts(dataset: &Dataset, field: &str) -> Result<AggregateTable> {
        Self::reduce(dataset, &AggregationSpec::new([field], field, Reduction::Count))
    }
}
