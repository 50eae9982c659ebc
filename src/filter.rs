//! Predicate filtering over datasets
//!
//! Each predicate is evaluated into an Arrow boolean mask; masks are combined
//! conjunctively and the matching rows selected with `filter_record_batch`,
//! so the original row order is preserved.
//!
//! Operands on numeric fields are compared by value, so an integer field
//! accepts fractional bounds (`Age` between 29.5 and 65) and `35.0` equals `35`.
//!
//! # Example
//!
//! ```rust
//! use ledger_insight::dataset::Dataset;
//! use ledger_insight::filter::{FilterEngine, Predicate};
//! use ledger_insight::schema::{catalog, RawRecord};
//!
//! # fn main() -> ledger_insight::Result<()> {
//! let schema = catalog::insurance();
//! let records = [("Asha", 25), ("Dev", 40), ("Ira", 60), ("Om", 70)]
//!     .into_iter()
//!     .map(|(name, age)| {
//!         schema.validate(
//!             RawRecord::new()
//!                 .set("Name", name)
//!                 .set("Age", age)
//!                 .set("Health_Risk_Score", 1.0)
//!                 .set("Premium_Amount", 100.0)
//!                 .set("Claim_Amount", 0.0),
//!         )
//!     })
//!     .collect::<ledger_insight::Result<Vec<_>>>()?;
//! let dataset = Dataset::from_records(schema, &records)?;
//!
//! let matched = FilterEngine::apply(&dataset, &[Predicate::range("Age", 30, 65)])?;
//! assert_eq!(matched.len(), 2);
//! # Ok(())
//! # }
//! ```

use crate::dataset::Dataset;
use crate::schema::{FieldKind, FieldSpec, Value};
use crate::{Error, Result};
use arrow::array::BooleanArray;
use arrow::compute;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Test applied to one field of every row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Cell equals the operand
    Equals(Value),
    /// Cell equals any of the operands
    InSet(Vec<Value>),
    /// `low <= cell <= high`; a `Null` bound leaves that side open
    Range {
        /// Inclusive lower bound
        low: Value,
        /// Inclusive upper bound
        high: Value,
    },
    /// Cell contains the text, ignoring case
    Contains(String),
}

impl Condition {
    const fn name(&self) -> &'static str {
        match self {
            Self::Equals(_) => "equals",
            Self::InSet(_) => "in-set",
            Self::Range { .. } => "range",
            Self::Contains(_) => "contains",
        }
    }
}

/// A condition bound to a field name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    /// Field the condition reads
    pub field: String,
    /// Condition every matching row satisfies
    pub condition: Condition,
}

impl Predicate {
    /// Predicate from parts
    #[must_use]
    pub fn new(field: impl Into<String>, condition: Condition) -> Self {
        Self {
            field: field.into(),
            condition,
        }
    }

    /// `field == value`
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Condition::Equals(value.into()))
    }

    /// `field ∈ values`
    #[must_use]
    pub fn in_set<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(field, Condition::InSet(values.into_iter().map(Into::into).collect()))
    }

    /// `low <= field <= high`
    #[must_use]
    pub fn range(field: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::new(
            field,
            Condition::Range {
                low: low.into(),
                high: high.into(),
            },
        )
    }

    /// Case-insensitive substring match
    #[must_use]
    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::new(field, Condition::Contains(needle.into()))
    }
}

/// Condition with operands coerced to the field's representation
enum Compiled {
    Equals(Value),
    InSet(Vec<Value>),
    Range(Value, Value),
    NumericIn(Vec<f64>),
    NumericRange(Option<f64>, Option<f64>),
    Contains(String),
}

impl Compiled {
    fn matches(&self, cell: &Value) -> bool {
        if cell.is_null() {
            return false;
        }
        match self {
            Self::Equals(v) => cell == v,
            Self::InSet(vs) => vs.contains(cell),
            Self::Range(low, high) => {
                (low.is_null() || cell >= low) && (high.is_null() || cell <= high)
            }
            Self::NumericIn(vs) => cell.as_f64().is_some_and(|x| vs.contains(&x)),
            Self::NumericRange(low, high) => cell
                .as_f64()
                .is_some_and(|x| low.map_or(true, |l| x >= l) && high.map_or(true, |h| x <= h)),
            Self::Contains(needle) => cell
                .as_str()
                .is_some_and(|s| s.to_lowercase().contains(needle.as_str())),
        }
    }
}

fn compile(spec: &FieldSpec, condition: &Condition) -> Result<Compiled> {
    let kind = spec.kind();
    let coerce = |value: &Value| {
        value.clone().coerce(kind).map_err(|reason| {
            Error::schema_mismatch(spec.name(), format!("{} operand rejected: {reason}", condition.name()))
        })
    };

    if kind.is_numeric() {
        let real = FieldKind::real(None, None);
        let number = |value: &Value| {
            value.clone().coerce(&real).map(|v| v.as_f64()).map_err(|reason| {
                Error::schema_mismatch(spec.name(), format!("{} operand rejected: {reason}", condition.name()))
            })
        };
        match condition {
            Condition::Equals(v) => return Ok(Compiled::NumericIn(number(v)?.into_iter().collect())),
            Condition::InSet(vs) => {
                let mut numbers = Vec::with_capacity(vs.len());
                for v in vs {
                    numbers.extend(number(v)?);
                }
                return Ok(Compiled::NumericIn(numbers));
            }
            Condition::Range { low, high } => return Ok(Compiled::NumericRange(number(low)?, number(high)?)),
            Condition::Contains(_) => {}
        }
    }

    match condition {
        Condition::Equals(v) => Ok(Compiled::Equals(coerce(v)?)),
        Condition::InSet(vs) => Ok(Compiled::InSet(vs.iter().map(coerce).collect::<Result<_>>()?)),
        Condition::Range { low, high } => {
            if !kind.is_ordered() {
                return Err(Error::schema_mismatch(
                    spec.name(),
                    format!("range filter needs a numeric or date field, found {}", kind.type_name()),
                ));
            }
            Ok(Compiled::Range(coerce(low)?, coerce(high)?))
        }
        Condition::Contains(needle) => {
            if !kind.is_textual() {
                return Err(Error::schema_mismatch(
                    spec.name(),
                    format!("substring filter needs a text field, found {}", kind.type_name()),
                ));
            }
            Ok(Compiled::Contains(needle.trim().to_lowercase()))
        }
    }
}

/// Conjunctive predicate evaluation
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterEngine;

impl FilterEngine {
    /// Rows of `dataset` satisfying every predicate, in original order.
    ///
    /// An empty predicate set returns the dataset unchanged.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] if a predicate names an unknown
    /// field, applies an operator the field's kind does not support, or
    /// carries an operand that cannot be coerced to the field's kind.
    /// All predicates are checked before any row is read.
    pub fn apply(dataset: &Dataset, predicates: &[Predicate]) -> Result<Dataset> {
        let schema = dataset.schema();
        let compiled = predicates
            .iter()
            .map(|p| {
                let (col, spec) = schema.resolve(&p.field)?;
                Ok((col, compile(spec, &p.condition)?))
            })
            .collect::<Result<Vec<_>>>()?;

        if compiled.is_empty() {
            return Ok(dataset.clone());
        }

        let mut combined: Option<BooleanArray> = None;
        for (col, condition) in &compiled {
            let mask = Self::build_mask(dataset, *col, condition);
            combined = Some(match combined {
                Some(acc) => compute::and(&acc, &mask)?,
                None => mask,
            });
        }

        let Some(mask) = combined else {
            return Ok(dataset.clone());
        };
        let filtered = dataset.select(&mask)?;
        debug!(
            kind = schema.name(),
            predicates = predicates.len(),
            rows_in = dataset.len(),
            rows_out = filtered.len(),
            "applied filter"
        );
        Ok(filtered)
    }

    fn build_mask(dataset: &Dataset, col: usize, condition: &Compiled) -> BooleanArray {
        let values: Vec<bool> = (0..dataset.len())
            .map(|row| condition.matches(&dataset.value(row, col)))
            .collect();
        BooleanArray::from(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{catalog, RawRecord};
    use chrono::NaiveDate;

    fn orders() -> Dataset {
        let schema = catalog::orders();
        let rows = [
            ("ORD-1", 22, "2024-01-05", "van", "Urban", Some("Low")),
            ("ORD-2", 35, "2024-01-10", "scooter", "Metropolitian", Some("Jam")),
            ("ORD-3", 41, "2024-01-15", "van", "Semi-Urban", None),
            ("ORD-4", 29, "2024-01-20", "motorcycle", "Urban", Some("High")),
        ];
        let records: Vec<_> = rows
            .into_iter()
            .map(|(id, age, date, vehicle, area, traffic)| {
                schema
                    .validate(
                        RawRecord::new()
                            .set("Order_ID", id)
                            .set("Agent_Age", age)
                            .set("Order_Date", date)
                            .set("Vehicle", vehicle)
                            .set("Area", area)
                            .set("Traffic", traffic)
                            .set("Delivery_Time", 30),
                    )
                    .unwrap()
            })
            .collect();
        Dataset::from_records(schema, &records).unwrap()
    }

    fn ids(dataset: &Dataset) -> Vec<String> {
        dataset
            .records()
            .map(|r| r.get("Order_ID").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_empty_predicate_set_is_identity() {
        let data = orders();
        assert_eq!(FilterEngine::apply(&data, &[]).unwrap(), data);
    }

    #[test]
    fn test_date_range_inclusive_both_ends() {
        let data = orders();
        let out = FilterEngine::apply(
            &data,
            &[Predicate::range("Order_Date", "2024-01-10", "2024-01-15")],
        )
        .unwrap();
        assert_eq!(ids(&out), ["ORD-2", "ORD-3"]);

        let typed = Predicate::range(
            "Order_Date",
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        );
        assert_eq!(FilterEngine::apply(&data, &[typed]).unwrap(), out);
    }

    #[test]
    fn test_open_ended_range() {
        let out = FilterEngine::apply(&orders(), &[Predicate::range("Agent_Age", 30, Value::Null)]).unwrap();
        assert_eq!(ids(&out), ["ORD-2", "ORD-3"]);
    }

    #[test]
    fn test_conjunction_of_multiselects() {
        let out = FilterEngine::apply(
            &orders(),
            &[
                Predicate::in_set("Vehicle", ["van", "motorcycle"]),
                Predicate::in_set("Area", ["Urban"]),
            ],
        )
        .unwrap();
        assert_eq!(ids(&out), ["ORD-1", "ORD-4"]);
    }

    #[test]
    fn test_null_cells_never_match() {
        let data = orders();
        let out = FilterEngine::apply(&data, &[Predicate::in_set("Traffic", ["Low", "Jam", "High"])]).unwrap();
        assert_eq!(out.len(), 3);
        let out = FilterEngine::apply(&data, &[Predicate::equals("Traffic", Value::Null)]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_contains_ignores_case() {
        let out = FilterEngine::apply(&orders(), &[Predicate::contains("Order_ID", "ord-3")]).unwrap();
        assert_eq!(ids(&out), ["ORD-3"]);
    }

    #[test]
    fn test_integer_operand_widens_for_equality() {
        let out = FilterEngine::apply(&orders(), &[Predicate::equals("Agent_Age", 35.0)]).unwrap();
        assert_eq!(ids(&out), ["ORD-2"]);
    }

    #[test]
    fn test_fractional_bounds_on_integer_field() {
        let data = orders();
        let out = FilterEngine::apply(&data, &[Predicate::range("Agent_Age", 29.5, 65)]).unwrap();
        assert_eq!(ids(&out), ["ORD-2", "ORD-3"]);

        let out = FilterEngine::apply(&data, &[Predicate::range("Agent_Age", 29, 35.0)]).unwrap();
        assert_eq!(ids(&out), ["ORD-2", "ORD-4"]);

        let out = FilterEngine::apply(&data, &[Predicate::equals("Agent_Age", 35.5)]).unwrap();
        assert!(out.is_empty());
        let out = FilterEngine::apply(&data, &[Predicate::in_set("Agent_Age", [Value::from(22), Value::from("41")])]).unwrap();
        assert_eq!(ids(&out), ["ORD-1", "ORD-3"]);

        let err = FilterEngine::apply(&data, &[Predicate::range("Agent_Age", "young", 40)]).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { ref field, .. } if field == "Agent_Age"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = FilterEngine::apply(&orders(), &[Predicate::equals("Driver", "x")]).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { ref field, .. } if field == "Driver"));
    }

    #[test]
    fn test_operator_kind_mismatch_rejected() {
        let data = orders();
        let err = FilterEngine::apply(&data, &[Predicate::range("Vehicle", "a", "z")]).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { ref field, .. } if field == "Vehicle"));

        let err = FilterEngine::apply(&data, &[Predicate::contains("Agent_Age", "3")]).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { ref field, .. } if field == "Agent_Age"));

        let err = FilterEngine::apply(&data, &[Predicate::equals("Order_Date", "soon")]).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    #[test]
    fn test_filter_on_empty_dataset() {
        let empty = Dataset::empty(catalog::orders());
        let out = FilterEngine::apply(&empty, &[Predicate::equals("Vehicle", "van")]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_predicate_serde() {
        let p = Predicate::range("Agent_Age", 20, 30);
        let json = serde_json::to_string(&p).unwrap();
        let back: Predicate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
