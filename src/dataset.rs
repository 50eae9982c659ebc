//! Immutable columnar snapshots of one record kind
//!
//! A [`Dataset`] wraps an Arrow [`RecordBatch`] whose columns follow the
//! [`Schema`] field order. Datasets are never mutated: appending produces a new
//! snapshot with a new content fingerprint, which is what keys the model cache.

use crate::schema::{FieldKind, Record, Schema, Value};
use crate::{Error, Result};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray, Time32SecondArray,
};
use arrow::compute;
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use rustc_hash::FxHasher;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Typed view of one column (cheap clone of the Arrow buffers)
#[derive(Debug, Clone)]
enum Column {
    Text(StringArray),
    Int(Int64Array),
    Real(Float64Array),
    Date(Date32Array),
    Time(Time32SecondArray),
}

impl Column {
    fn from_array(name: &str, kind: &FieldKind, array: &ArrayRef) -> Result<Self> {
        let mismatch = || {
            Error::Storage(format!(
                "column '{name}' is {:?}, expected {:?}",
                array.data_type(),
                kind.data_type()
            ))
        };
        Ok(match kind {
            FieldKind::Identifier | FieldKind::Text | FieldKind::Categorical { .. } => Self::Text(
                array
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(mismatch)?
                    .clone(),
            ),
            FieldKind::Integer { .. } => Self::Int(
                array
                    .as_any()
                    .downcast_ref::<Int64Array>()
                    .ok_or_else(mismatch)?
                    .clone(),
            ),
            FieldKind::Real { .. } => Self::Real(
                array
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(mismatch)?
                    .clone(),
            ),
            FieldKind::Date => Self::Date(
                array
                    .as_any()
                    .downcast_ref::<Date32Array>()
                    .ok_or_else(mismatch)?
                    .clone(),
            ),
            FieldKind::Time => Self::Time(
                array
                    .as_any()
                    .downcast_ref::<Time32SecondArray>()
                    .ok_or_else(mismatch)?
                    .clone(),
            ),
        })
    }

    fn value(&self, row: usize) -> Value {
        match self {
            Self::Text(a) if !a.is_null(row) => Value::Text(a.value(row).to_string()),
            Self::Int(a) if !a.is_null(row) => Value::Int(a.value(row)),
            Self::Real(a) if !a.is_null(row) => Value::Real(a.value(row)),
            Self::Date(a) if !a.is_null(row) => date_from_days(a.value(row)).map_or(Value::Null, Value::Date),
            Self::Time(a) if !a.is_null(row) => time_from_seconds(a.value(row)).map_or(Value::Null, Value::Time),
            _ => Value::Null,
        }
    }

    fn numeric(&self, row: usize) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(a) if !a.is_null(row) => Some(a.value(row) as f64),
            Self::Real(a) if !a.is_null(row) => Some(a.value(row)),
            _ => None,
        }
    }
}

/// Days since the Unix epoch for an Arrow `Date32` cell
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn days_from_date(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

/// Calendar date of an Arrow `Date32` cell
#[must_use]
pub fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::default().checked_add_signed(Duration::days(i64::from(days)))
}

/// Seconds since midnight for an Arrow `Time32(Second)` cell
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn seconds_from_time(time: NaiveTime) -> i32 {
    time.num_seconds_from_midnight() as i32
}

/// Time of day of an Arrow `Time32(Second)` cell
#[must_use]
pub fn time_from_seconds(seconds: i32) -> Option<NaiveTime> {
    u32::try_from(seconds)
        .ok()
        .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, 0))
}

/// Name of the hour-of-day field derived from a time field:
/// `Order_Time` becomes `Order_Hour`, anything else gets an `_Hour` suffix
#[must_use]
pub fn hour_field_name(time_field: &str) -> String {
    let stem = time_field.strip_suffix("_Time").unwrap_or(time_field);
    format!("{stem}_Hour")
}

/// An ordered, homogeneous collection of records of one schema.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Arc<Schema>,
    batch: RecordBatch,
    columns: Vec<Column>,
    fingerprint: u64,
}

impl Dataset {
    /// Empty dataset conforming to `schema`
    #[must_use]
    pub fn empty(schema: Arc<Schema>) -> Self {
        let batch = RecordBatch::new_empty(Arc::new(schema.arrow_schema()));
        let columns = schema
            .fields()
            .iter()
            .map(|f| match f.kind() {
                FieldKind::Identifier | FieldKind::Text | FieldKind::Categorical { .. } => {
                    Column::Text(StringArray::from(Vec::<Option<String>>::new()))
                }
                FieldKind::Integer { .. } => Column::Int(Int64Array::from(Vec::<Option<i64>>::new())),
                FieldKind::Real { .. } => Column::Real(Float64Array::from(Vec::<Option<f64>>::new())),
                FieldKind::Date => Column::Date(Date32Array::from(Vec::<Option<i32>>::new())),
                FieldKind::Time => Column::Time(Time32SecondArray::from(Vec::<Option<i32>>::new())),
            })
            .collect();
        let fingerprint = fingerprint_of(&schema, &[], 0);
        Self {
            schema,
            batch,
            columns,
            fingerprint,
        }
    }

    /// Build a dataset from validated records, preserving their order.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] if a record belongs to another schema
    pub fn from_records(schema: Arc<Schema>, records: &[Record]) -> Result<Self> {
        for record in records {
            if record.schema().as_ref() != schema.as_ref() {
                return Err(Error::schema_mismatch(
                    record.schema().name(),
                    format!("record does not belong to schema '{}'", schema.name()),
                ));
            }
        }

        let arrays: Vec<ArrayRef> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, field)| build_array(field.kind(), records.iter().map(|r| &r.values()[idx])))
            .collect();
        let batch = RecordBatch::try_new(Arc::new(schema.arrow_schema()), arrays)?;
        Self::assemble(schema, batch)
    }

    /// Wrap an Arrow batch read from outside, re-checking every cell against
    /// the schema's constraints.
    ///
    /// # Errors
    /// Returns [`Error::Storage`] if the batch layout differs from the schema
    /// and [`Error::Validation`] if a cell violates its field constraints
    pub fn from_batch(schema: Arc<Schema>, batch: RecordBatch) -> Result<Self> {
        let batch_schema = batch.schema();
        if batch_schema.fields().len() != schema.fields().len() {
            return Err(Error::Storage(format!(
                "expected {} columns for '{}', found {}",
                schema.fields().len(),
                schema.name(),
                batch_schema.fields().len()
            )));
        }
        for (spec, field) in schema.fields().iter().zip(batch_schema.fields()) {
            if spec.name() != field.name() || &spec.kind().data_type() != field.data_type() {
                return Err(Error::Storage(format!(
                    "column '{}' ({:?}) does not match field '{}' ({:?})",
                    field.name(),
                    field.data_type(),
                    spec.name(),
                    spec.kind().data_type()
                )));
            }
        }

        // Normalise nullability flags to the schema's own Arrow schema
        let batch = RecordBatch::try_new(Arc::new(schema.arrow_schema()), batch.columns().to_vec())?;
        let dataset = Self::assemble(schema, batch)?;
        for row in 0..dataset.len() {
            for (col, column) in dataset.columns.iter().enumerate() {
                dataset.schema.check_value(col, &column.value(row))?;
            }
        }
        Ok(dataset)
    }

    fn assemble(schema: Arc<Schema>, batch: RecordBatch) -> Result<Self> {
        let columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(spec, array)| Column::from_array(spec.name(), spec.kind(), array))
            .collect::<Result<Vec<_>>>()?;
        let fingerprint = fingerprint_of(&schema, &columns, batch.num_rows());
        Ok(Self {
            schema,
            batch,
            columns,
            fingerprint,
        })
    }

    /// Schema shared by every record
    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Underlying Arrow batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    /// Whether the dataset has no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Content fingerprint (equal content, equal fingerprint)
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Cell value; `Null` for out-of-range coordinates
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> Value {
        if row >= self.len() {
            return Value::Null;
        }
        self.columns.get(col).map_or(Value::Null, |c| c.value(row))
    }

    /// Numeric cell value, `None` for nulls and non-numeric columns
    #[must_use]
    pub fn numeric(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.len() {
            return None;
        }
        self.columns.get(col).and_then(|c| c.numeric(row))
    }

    /// Record at position `row`
    #[must_use]
    pub fn record(&self, row: usize) -> Option<Record> {
        (row < self.len()).then(|| {
            Record::from_parts(
                Arc::clone(&self.schema),
                self.columns.iter().map(|c| c.value(row)).collect(),
            )
        })
    }

    /// Records in insertion order
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        (0..self.len()).filter_map(|row| self.record(row))
    }

    /// Most recently appended record
    #[must_use]
    pub fn last(&self) -> Option<Record> {
        self.len().checked_sub(1).and_then(|row| self.record(row))
    }

    /// New snapshot with `record` appended at the end.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] if the record belongs to another schema
    pub fn with_appended(&self, record: &Record) -> Result<Self> {
        let tail = Self::from_records(Arc::clone(&self.schema), std::slice::from_ref(record))?;
        let batch = compute::concat_batches(&self.batch.schema(), [&self.batch, &tail.batch])?;
        Self::assemble(Arc::clone(&self.schema), batch)
    }

    /// Copy of the dataset with the hour of day of `time_field` appended as
    /// an optional integer field named by [`hour_field_name`].
    ///
    /// The derived field takes part in grouping, statistics and regression
    /// like any stored numeric field.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] if the field is unknown or not a
    /// time field, and [`Error::InvalidInput`] if the derived name is taken
    pub fn with_hour_of(&self, time_field: &str) -> Result<Self> {
        let (col, spec) = self.schema.resolve(time_field)?;
        if spec.kind() != &FieldKind::Time {
            return Err(Error::schema_mismatch(
                time_field,
                format!("hour of day needs a time field, found {}", spec.kind().type_name()),
            ));
        }
        let schema = Arc::new(
            self.schema
                .with_optional_field(hour_field_name(time_field), FieldKind::integer(Some(0), Some(23)))?,
        );
        let hours: Int64Array = (0..self.len())
            .map(|row| self.value(row, col).as_time().map(|t| i64::from(t.hour())))
            .collect();

        let mut columns = self.batch.columns().to_vec();
        columns.push(Arc::new(hours));
        let batch = RecordBatch::try_new(Arc::new(schema.arrow_schema()), columns)?;
        Self::assemble(schema, batch)
    }

    /// Rows where `mask` is true, in original order
    pub(crate) fn select(&self, mask: &BooleanArray) -> Result<Self> {
        let batch = compute::filter_record_batch(&self.batch, mask)?;
        Self::assemble(Arc::clone(&self.schema), batch)
    }

    /// Rows as a JSON array of objects keyed by field name
    ///
    /// # Errors
    /// Returns error if a value cannot be represented in JSON
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.batch == other.batch
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for record in self.records() {
            seq.serialize_element(&record)?;
        }
        seq.end()
    }
}

fn build_array<'a>(kind: &FieldKind, values: impl Iterator<Item = &'a Value>) -> ArrayRef {
    match kind {
        FieldKind::Identifier | FieldKind::Text | FieldKind::Categorical { .. } => Arc::new(
            values
                .map(|v| v.as_str().map(str::to_string))
                .collect::<StringArray>(),
        ),
        FieldKind::Integer { .. } => Arc::new(
            values
                .map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect::<Int64Array>(),
        ),
        FieldKind::Real { .. } => Arc::new(values.map(Value::as_f64).collect::<Float64Array>()),
        FieldKind::Date => Arc::new(
            values
                .map(|v| v.as_date().map(days_from_date))
                .collect::<Date32Array>(),
        ),
        FieldKind::Time => Arc::new(
            values
                .map(|v| v.as_time().map(seconds_from_time))
                .collect::<Time32SecondArray>(),
        ),
    }
}

fn hash_schema(schema: &Schema, hasher: &mut FxHasher) {
    schema.name().hash(hasher);
    schema.identifier().hash(hasher);
    for field in schema.fields() {
        field.name().hash(hasher);
        field.is_required().hash(hasher);
        field.default_value().hash(hasher);
        field.kind().type_name().hash(hasher);
        match field.kind() {
            FieldKind::Categorical { domain } => domain.hash(hasher),
            FieldKind::Integer { min, max } => (min, max).hash(hasher),
            FieldKind::Real { min, max } => {
                (min.map(f64::to_bits), max.map(f64::to_bits)).hash(hasher);
            }
            FieldKind::Identifier | FieldKind::Text | FieldKind::Date | FieldKind::Time => {}
        }
    }
}

fn fingerprint_of(schema: &Schema, columns: &[Column], rows: usize) -> u64 {
    let mut hasher = FxHasher::default();
    hash_schema(schema, &mut hasher);
    rows.hash(&mut hasher);
    for row in 0..rows {
        for column in columns {
            column.value(row).hash(&mut hasher);
        }
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, IdentifierPolicy, RawRecord};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder("people")
                .identifier("Name", IdentifierPolicy::AllowDuplicates)
                .required("Age", FieldKind::integer(Some(18), None))
                .required("Balance", FieldKind::real(Some(0.0), None))
                .optional("Joined", FieldKind::Date)
                .build()
                .unwrap(),
        )
    }

    fn record(schema: &Arc<Schema>, name: &str, age: i64, balance: f64) -> Record {
        schema
            .validate(
                RawRecord::new()
                    .set("Name", name)
                    .set("Age", age)
                    .set("Balance", balance)
                    .set("Joined", "2023-06-30"),
            )
            .unwrap()
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = Dataset::empty(schema());
        assert!(dataset.is_empty());
        assert_eq!(dataset.batch().num_columns(), 4);
        assert!(dataset.last().is_none());
        assert_eq!(dataset, Dataset::from_records(schema(), &[]).unwrap());
    }

    #[test]
    fn test_records_round_trip_through_columns() {
        let schema = schema();
        let records = vec![record(&schema, "A", 25, 1000.0), record(&schema, "B", 40, 5000.0)];
        let dataset = Dataset::from_records(Arc::clone(&schema), &records).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records().collect::<Vec<_>>(), records);
        assert_eq!(dataset.numeric(1, 1), Some(40.0));
        assert_eq!(dataset.value(0, 3), Value::Date(NaiveDate::from_ymd_opt(2023, 6, 30).unwrap()));
        assert_eq!(dataset.value(9, 0), Value::Null);
    }

    #[test]
    fn test_append_changes_fingerprint() {
        let schema = schema();
        let base = Dataset::from_records(Arc::clone(&schema), &[record(&schema, "A", 25, 1.0)]).unwrap();
        let same = Dataset::from_records(Arc::clone(&schema), &[record(&schema, "A", 25, 1.0)]).unwrap();
        let grown = base.with_appended(&record(&schema, "B", 30, 2.0)).unwrap();

        assert_eq!(base.fingerprint(), same.fingerprint());
        assert_ne!(base.fingerprint(), grown.fingerprint());
        assert_eq!(grown.last().unwrap().get("Name"), Some(&Value::from("B")));
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_fingerprint_covers_schema_definition() {
        let build = |field: &str| {
            let schema = Arc::new(
                Schema::builder("people")
                    .identifier("Name", IdentifierPolicy::AllowDuplicates)
                    .required(field, FieldKind::integer(Some(18), None))
                    .build()
                    .unwrap(),
            );
            let record = schema
                .validate(RawRecord::new().set("Name", "A").set(field, 30))
                .unwrap();
            Dataset::from_records(schema, &[record]).unwrap()
        };
        assert_eq!(build("Age").fingerprint(), build("Age").fingerprint());
        assert_ne!(build("Age").fingerprint(), build("Tenure").fingerprint());
    }

    #[test]
    fn test_hour_of_time_field() {
        let schema = Arc::new(
            Schema::builder("orders")
                .identifier("Order_ID", IdentifierPolicy::Unique)
                .optional("Order_Time", FieldKind::Time)
                .build()
                .unwrap(),
        );
        let records: Vec<_> = [Some("08:15:00"), None, Some("19:59:59")]
            .into_iter()
            .enumerate()
            .map(|(i, time)| {
                schema
                    .validate(RawRecord::new().set("Order_ID", format!("O{i}")).set("Order_Time", time))
                    .unwrap()
            })
            .collect();
        let data = Dataset::from_records(Arc::clone(&schema), &records).unwrap();
        assert_eq!(data.value(2, 1).to_string(), "19:59:59");

        let derived = data.with_hour_of("Order_Time").unwrap();
        let col = derived.schema().index_of("Order_Hour").unwrap();
        assert_eq!(derived.numeric(0, col), Some(8.0));
        assert_eq!(derived.value(1, col), Value::Null);
        assert_eq!(derived.numeric(2, col), Some(19.0));
        assert_eq!(derived.len(), data.len());

        assert!(matches!(
            data.with_hour_of("Order_ID"),
            Err(Error::SchemaMismatch { .. })
        ));
        assert!(matches!(
            derived.with_hour_of("Order_Time"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_from_batch_rechecks_constraints() {
        let schema = schema();
        let bad = Record::from_parts(
            Arc::clone(&schema),
            vec![Value::from("X"), Value::Int(12), Value::Real(1.0), Value::Null],
        );
        let batch = Dataset::from_records(Arc::clone(&schema), &[bad]).unwrap().batch().clone();
        let err = Dataset::from_batch(schema, batch).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "Age"));
    }

    #[test]
    fn test_date_days_conversion() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(date_from_days(days_from_date(date)), Some(date));
        assert_eq!(days_from_date(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
    }

    #[test]
    fn test_json_rows() {
        let schema = schema();
        let dataset = Dataset::from_records(Arc::clone(&schema), &[record(&schema, "A", 25, 10.5)]).unwrap();
        let json = dataset.to_json().unwrap();
        assert_eq!(json[0]["Name"], "A");
        assert_eq!(json[0]["Balance"], 10.5);
        assert_eq!(json[0]["Joined"], "2023-06-30");
    }
}
