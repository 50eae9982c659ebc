//! Record schemas and validation
//!
//! A [`Schema`] fixes the ordered, typed fields of one record kind. Records only
//! enter a store through [`Schema::validate`], which either returns a complete
//! immutable [`Record`] or a [`crate::Error::Validation`] naming the field at
//! fault. No partial records are ever produced.
//!
//! ## Example
//!
//! ```rust
//! use ledger_insight::schema::{catalog, RawRecord};
//!
//! let schema = catalog::insurance();
//! let record = schema.validate(
//!     RawRecord::new()
//!         .set("Name", "Asha Verma")
//!         .set("Age", 42)
//!         .set("Health_Risk_Score", "6.5")
//!         .set("Premium_Amount", 1200.0)
//!         .set("Claim_Amount", 300.0),
//! )?;
//! assert_eq!(record.get("Is_Defaulter").and_then(|v| v.as_f64()), Some(0.0));
//! # Ok::<(), ledger_insight::Error>(())
//! ```

pub mod catalog;
mod record;
mod value;

pub use record::{RawRecord, Record};
pub use value::{Value, DATE_FORMAT, TIME_FORMAT};

use crate::{Error, Result};
use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema, TimeUnit};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Type class of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Record identifier (account id, order id, customer name)
    Identifier,
    /// Free-form text
    Text,
    /// Finite string domain
    Categorical {
        /// Allowed labels
        domain: Vec<String>,
    },
    /// Integer with optional inclusive bounds
    Integer {
        /// Inclusive lower bound
        #[serde(default)]
        min: Option<i64>,
        /// Inclusive upper bound
        #[serde(default)]
        max: Option<i64>,
    },
    /// Real number with optional inclusive bounds
    Real {
        /// Inclusive lower bound
        #[serde(default)]
        min: Option<f64>,
        /// Inclusive upper bound
        #[serde(default)]
        max: Option<f64>,
    },
    /// Calendar date (`YYYY-MM-DD`)
    Date,
    /// Time of day (`HH:MM:SS`)
    Time,
}

impl FieldKind {
    /// Categorical field over the given labels
    pub fn categorical<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Categorical {
            domain: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Integer field bounded by `min..=max`
    #[must_use]
    pub const fn integer(min: Option<i64>, max: Option<i64>) -> Self {
        Self::Integer { min, max }
    }

    /// Real field bounded by `min..=max`
    #[must_use]
    pub const fn real(min: Option<f64>, max: Option<f64>) -> Self {
        Self::Real { min, max }
    }

    /// Whether values of this kind are numbers
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer { .. } | Self::Real { .. })
    }

    /// Whether values of this kind are strings
    #[must_use]
    pub const fn is_textual(&self) -> bool {
        matches!(self, Self::Identifier | Self::Text | Self::Categorical { .. })
    }

    /// Whether values of this kind can be range-filtered
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.is_numeric() || matches!(self, Self::Date | Self::Time)
    }

    /// Short name for error messages
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Text => "text",
            Self::Categorical { .. } => "categorical",
            Self::Integer { .. } => "integer",
            Self::Real { .. } => "real",
            Self::Date => "date",
            Self::Time => "time",
        }
    }

    /// Arrow column type backing this kind
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Identifier | Self::Text | Self::Categorical { .. } => DataType::Utf8,
            Self::Integer { .. } => DataType::Int64,
            Self::Real { .. } => DataType::Float64,
            Self::Date => DataType::Date32,
            Self::Time => DataType::Time32(TimeUnit::Second),
        }
    }

    /// Check a coerced, non-null value against the domain and bounds.
    ///
    /// # Errors
    /// Returns the violated constraint, human readable.
    pub fn check(&self, value: &Value) -> std::result::Result<(), String> {
        match (self, value) {
            (_, Value::Null) => Ok(()),
            (Self::Categorical { domain }, Value::Text(s)) => {
                if domain.iter().any(|label| label == s) {
                    Ok(())
                } else {
                    Err(format!("'{s}' is not one of [{}]", domain.join(", ")))
                }
            }
            (Self::Integer { min, max }, Value::Int(i)) => {
                if min.is_some_and(|m| *i < m) || max.is_some_and(|m| *i > m) {
                    Err(format!("{i} is outside {}", bounds_label(min.as_ref(), max.as_ref())))
                } else {
                    Ok(())
                }
            }
            (Self::Real { min, max }, Value::Real(r)) => {
                if !r.is_finite() {
                    Err(format!("{r} is not a finite number"))
                } else if min.is_some_and(|m| *r < m) || max.is_some_and(|m| *r > m) {
                    Err(format!("{r} is outside {}", bounds_label(min.as_ref(), max.as_ref())))
                } else {
                    Ok(())
                }
            }
            (Self::Identifier | Self::Text, Value::Text(_)) | (Self::Date, Value::Date(_))
            | (Self::Time, Value::Time(_)) => Ok(()),
            (kind, value) => Err(format!(
                "{} value does not fit a {} field",
                value.type_name(),
                kind.type_name()
            )),
        }
    }
}

fn bounds_label<T: std::fmt::Display>(min: Option<&T>, max: Option<&T>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) => format!("[{lo}, {hi}]"),
        (Some(lo), None) => format!(">= {lo}"),
        (None, Some(hi)) => format!("<= {hi}"),
        (None, None) => "any value".to_string(),
    }
}

/// One named, typed column of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    name: String,
    #[serde(flatten)]
    kind: FieldKind,
    #[serde(default = "default_required")]
    required: bool,
    #[serde(default)]
    default: Value,
}

const fn default_required() -> bool {
    true
}

impl FieldSpec {
    /// Field name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field kind
    #[must_use]
    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether a value must be supplied
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Value used when an optional field is absent
    #[must_use]
    pub const fn default_value(&self) -> &Value {
        &self.default
    }
}

/// How a store treats a repeated identifier on append.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierPolicy {
    /// Repeated identifiers are legitimate (e.g. a transaction ledger)
    #[default]
    AllowDuplicates,
    /// Appending an identifier already present is a validation error
    Unique,
}

/// Ordered field list of one record kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    fields: Vec<FieldSpec>,
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    identifier_policy: IdentifierPolicy,
}

impl Schema {
    /// Start building a schema for the record kind `name`
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Parse a schema declared in JSON and check its definition.
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or the definition is inconsistent
    /// (duplicate field names, unknown identifier, defaults violating their kind).
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: Self = serde_json::from_str(json)?;
        schema.checked()
    }

    /// Check the definition and store every default in its field's representation
    fn checked(mut self) -> Result<Self> {
        if self.fields.is_empty() {
            return Err(Error::InvalidInput(format!(
                "schema '{}' declares no fields",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for field in &mut self.fields {
            if field.name.trim().is_empty() || field.name.contains(',') {
                return Err(Error::InvalidInput(format!(
                    "schema '{}' has an invalid field name '{}'",
                    self.name, field.name
                )));
            }
            if !seen.insert(field.name.clone()) {
                return Err(Error::InvalidInput(format!(
                    "schema '{}' declares field '{}' twice",
                    self.name, field.name
                )));
            }
            if !field.default.is_null() {
                // JSON defaults arrive untagged (`0` for a real, a string for a date)
                field.default = field
                    .default
                    .clone()
                    .coerce(&field.kind)
                    .and_then(|v| field.kind.check(&v).map(|()| v))
                    .map_err(|reason| {
                        Error::InvalidInput(format!("default of '{}': {reason}", field.name))
                    })?;
            }
        }

        if let Some(id) = &self.identifier {
            let spec = self.field(id).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "schema '{}' names unknown identifier field '{id}'",
                    self.name
                ))
            })?;
            if !spec.kind.is_textual() || !spec.required {
                return Err(Error::InvalidInput(format!(
                    "identifier field '{id}' must be a required string field"
                )));
            }
        }
        Ok(self)
    }

    /// Record kind name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declared order
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Field names in declared order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldSpec::name)
    }

    /// Look up a field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field in declared order
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Resolve a field, failing with [`Error::SchemaMismatch`] if it is unknown
    ///
    /// # Errors
    /// Returns error if the schema has no field called `name`
    pub fn resolve(&self, name: &str) -> Result<(usize, &FieldSpec)> {
        self.index_of(name)
            .map(|idx| (idx, &self.fields[idx]))
            .ok_or_else(|| {
                Error::schema_mismatch(name, format!("not a field of '{}'", self.name))
            })
    }

    /// Identifier field name, if the record kind has one
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Uniqueness policy for the identifier field
    #[must_use]
    pub const fn identifier_policy(&self) -> IdentifierPolicy {
        self.identifier_policy
    }

    /// Copy of the schema with one optional field appended.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if the name is already taken or invalid
    pub fn with_optional_field(&self, name: impl Into<String>, kind: FieldKind) -> Result<Self> {
        let mut fields = self.fields.clone();
        fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: false,
            default: Value::Null,
        });
        Self {
            name: self.name.clone(),
            fields,
            identifier: self.identifier.clone(),
            identifier_policy: self.identifier_policy,
        }
        .checked()
    }

    /// Arrow schema of the columnar representation
    #[must_use]
    pub fn arrow_schema(&self) -> ArrowSchema {
        ArrowSchema::new(
            self.fields
                .iter()
                .map(|f| ArrowField::new(f.name.clone(), f.kind.data_type(), !f.required))
                .collect::<Vec<_>>(),
        )
    }

    /// Validate raw input into a [`Record`].
    ///
    /// # Errors
    /// Returns [`Error::Validation`] naming the first offending field when a
    /// required field is missing or blank, a field is unknown or supplied twice,
    /// a value cannot be parsed, or a domain/bound constraint is violated.
    pub fn validate(self: &Arc<Self>, raw: RawRecord) -> Result<Record> {
        let mut slots: Vec<Option<Value>> = vec![None; self.fields.len()];

        for (name, value) in raw.into_pairs() {
            let idx = self.index_of(&name).ok_or_else(|| {
                Error::validation(&name, format!("not a field of '{}'", self.name))
            })?;
            if slots[idx].is_some() {
                return Err(Error::validation(&name, "supplied more than once"));
            }
            slots[idx] = Some(value);
        }

        let mut values = Vec::with_capacity(self.fields.len());
        for (spec, slot) in self.fields.iter().zip(slots) {
            let value = slot
                .unwrap_or(Value::Null)
                .coerce(&spec.kind)
                .map_err(|reason| Error::validation(&spec.name, reason))?;
            let value = if value.is_null() {
                if spec.required {
                    return Err(Error::validation(&spec.name, "required field is missing"));
                }
                spec.default.clone()
            } else {
                value
            };
            spec.kind
                .check(&value)
                .map_err(|reason| Error::validation(&spec.name, reason))?;
            values.push(value);
        }

        Ok(Record::from_parts(Arc::clone(self), values))
    }

    /// Re-check a stored value against the constraints of field `idx`.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] if the value is missing for a required field
    /// or violates the field's kind, domain or bounds.
    pub fn check_value(&self, idx: usize, value: &Value) -> Result<()> {
        let spec = self.fields.get(idx).ok_or_else(|| {
            Error::InvalidInput(format!("field index {idx} out of bounds for '{}'", self.name))
        })?;
        if value.is_null() && spec.required {
            return Err(Error::validation(&spec.name, "required field is missing"));
        }
        spec.kind
            .check(value)
            .map_err(|reason| Error::validation(&spec.name, reason))
    }
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    identifier: Option<String>,
    identifier_policy: IdentifierPolicy,
}

impl SchemaBuilder {
    /// Create a builder for the record kind `name`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            identifier: None,
            identifier_policy: IdentifierPolicy::default(),
        }
    }

    /// Add a required field
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: true,
            default: Value::Null,
        });
        self
    }

    /// Add an optional field that defaults to absent
    #[must_use]
    pub fn optional(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.optional_with_default(name, kind, Value::Null)
    }

    /// Add an optional field with a default value
    #[must_use]
    pub fn optional_with_default(
        mut self,
        name: impl Into<String>,
        kind: FieldKind,
        default: impl Into<Value>,
    ) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: false,
            default: default.into(),
        });
        self
    }

    /// Add a required identifier field and mark it as the record identifier
    #[must_use]
    pub fn identifier(mut self, name: impl Into<String>, policy: IdentifierPolicy) -> Self {
        let name = name.into();
        self.identifier = Some(name.clone());
        self.identifier_policy = policy;
        self.required(name, FieldKind::Identifier)
    }

    /// Build the schema
    ///
    /// # Errors
    /// Returns error if the definition is inconsistent
    pub fn build(self) -> Result<Schema> {
        self.finish().checked()
    }

    pub(crate) fn finish(self) -> Schema {
        Schema {
            name: self.name,
            fields: self.fields,
            identifier: self.identifier,
            identifier_policy: self.identifier_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn accounts() -> Arc<Schema> {
        Arc::new(
            Schema::builder("accounts")
                .identifier("Account_ID", IdentifierPolicy::Unique)
                .required("Age", FieldKind::integer(Some(18), Some(100)))
                .required("Account_Type", FieldKind::categorical(["Savings", "Current"]))
                .required("Balance", FieldKind::real(Some(0.0), None))
                .required("Rating", FieldKind::integer(Some(1), Some(5)))
                .required("Opening_Date", FieldKind::Date)
                .optional("Closing_Date", FieldKind::Date)
                .build()
                .unwrap(),
        )
    }

    fn valid_raw() -> RawRecord {
        RawRecord::new()
            .set("Account_ID", "AC-1")
            .set("Age", "25")
            .set("Account_Type", "Savings")
            .set("Balance", 1000.0)
            .set("Rating", 4)
            .set("Opening_Date", "2024-01-15")
    }

    #[test]
    fn test_validate_builds_ordered_record() {
        let schema = accounts();
        let record = schema.validate(valid_raw()).unwrap();

        assert_eq!(record.values().len(), 7);
        assert_eq!(record.get("Age"), Some(&Value::Int(25)));
        assert_eq!(
            record.get("Opening_Date"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))
        );
        assert_eq!(record.get("Closing_Date"), Some(&Value::Null));
    }

    #[test]
    fn test_missing_required_field_named() {
        let schema = accounts();
        let raw = RawRecord::new().set("Account_ID", "AC-1");
        let err = schema.validate(raw).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "Age"));
    }

    #[test]
    fn test_blank_required_text_is_missing() {
        let schema = accounts();
        let err = schema
            .validate(valid_raw().set("Account_ID", "   "))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, ref constraint }
            if field == "Account_ID" && constraint.contains("missing")));
    }

    #[test]
    fn test_bounds_and_domain_enforced() {
        let schema = accounts();

        let err = schema.validate(valid_raw().set("Age", 17)).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, ref constraint }
            if field == "Age" && constraint.contains("[18, 100]")));

        let err = schema.validate(valid_raw().set("Rating", 6)).unwrap_err();
        assert!(err.to_string().contains("Rating"));

        let err = schema
            .validate(valid_raw().set("Account_Type", "Crypto"))
            .unwrap_err();
        assert!(err.to_string().contains("Crypto"));

        let err = schema.validate(valid_raw().set("Balance", -1.0)).unwrap_err();
        assert!(err.to_string().contains("Balance"));
    }

    #[test]
    fn test_unknown_and_duplicate_fields_rejected() {
        let schema = accounts();
        let err = schema.validate(valid_raw().set("Nickname", "x")).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "Nickname"));

        let mut pairs: Vec<(String, Value)> = valid_raw().into_pairs().collect();
        pairs.push(("Age".to_string(), Value::Int(30)));
        let err = schema.validate(pairs.into_iter().collect()).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_builder_rejects_inconsistent_definitions() {
        assert!(Schema::builder("dup")
            .required("A", FieldKind::Text)
            .required("A", FieldKind::Text)
            .build()
            .is_err());
        assert!(Schema::builder("bad_default")
            .optional_with_default("Rating", FieldKind::integer(Some(1), Some(5)), 9)
            .build()
            .is_err());
        assert!(Schema::builder("empty").build().is_err());
    }

    #[test]
    fn test_schema_json_round_trip() {
        let schema = accounts();
        let json = serde_json::to_string(schema.as_ref()).unwrap();
        let parsed = Schema::from_json(&json).unwrap();
        assert_eq!(&parsed, schema.as_ref());
    }

    #[test]
    fn test_schema_from_handwritten_json() {
        let schema = Schema::from_json(
            r#"{
                "name": "sensors",
                "identifier": "Tag",
                "identifier_policy": "unique",
                "fields": [
                    {"name": "Tag", "type": "identifier"},
                    {"name": "Level", "type": "real", "min": 0.0},
                    {"name": "Zone", "type": "categorical", "domain": ["A", "B"], "required": false}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(schema.identifier_policy(), IdentifierPolicy::Unique);
        assert!(!schema.field("Zone").unwrap().is_required());
        assert_eq!(schema.arrow_schema().fields().len(), 3);
    }

    #[test]
    fn test_json_defaults_take_field_representation() {
        let schema = Schema::from_json(
            r#"{
                "name": "loans",
                "fields": [
                    {"name": "Rate", "type": "real", "required": false, "default": 0},
                    {"name": "Start", "type": "date", "required": false, "default": "2024-01-01"},
                    {"name": "Cutoff", "type": "time", "required": false, "default": "17:30:00"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(schema.field("Rate").unwrap().default_value(), &Value::Real(0.0));
        assert_eq!(
            schema.field("Start").unwrap().default_value(),
            &Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(
            schema.field("Cutoff").unwrap().default_value().to_string(),
            "17:30:00"
        );

        let record = Arc::new(schema).validate(RawRecord::new()).unwrap();
        assert_eq!(record.get("Rate"), Some(&Value::Real(0.0)));

        assert!(Schema::from_json(
            r#"{"name": "bad", "fields": [
                {"name": "Start", "type": "date", "required": false, "default": "soon"}
            ]}"#
        )
        .is_err());
    }

    #[test]
    fn test_with_optional_field() {
        let schema = accounts();
        let extended = schema
            .with_optional_field("Opening_Hour", FieldKind::integer(Some(0), Some(23)))
            .unwrap();
        assert_eq!(extended.fields().len(), schema.fields().len() + 1);
        assert_eq!(extended.identifier(), Some("Account_ID"));
        assert!(schema.with_optional_field("Age", FieldKind::Text).is_err());
    }

    #[test]
    fn test_check_value_reports_violation() {
        let schema = accounts();
        let idx = schema.index_of("Rating").unwrap();
        assert!(schema.check_value(idx, &Value::Int(3)).is_ok());
        assert!(schema.check_value(idx, &Value::Int(0)).is_err());
        assert!(schema.check_value(idx, &Value::Null).is_err());
    }
}
