//! Cell values and their coercion into declared field kinds

use super::FieldKind;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Calendar date format used for parsing, display and the durable file
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time-of-day format used for parsing, display and the durable file
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// A single cell value.
///
/// Serialized untagged so the presentation layer sees plain JSON scalars.
/// Values are totally ordered (nulls first, then numbers, dates, times and text)
/// so they can be used directly as group keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Signed integer
    Int(i64),
    /// Finite real number
    Real(f64),
    /// String (identifier, free text or categorical label)
    Text(String),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day, second precision
    Time(NaiveTime),
}

impl Value {
    /// Whether the value is absent
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the value, if it is a number
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// String view of the value, if it is text
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Date view of the value, if it is a date
    #[must_use]
    pub const fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Time view of the value, if it is a time of day
    #[must_use]
    pub const fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Self::Time(t) => Some(*t),
            _ => None,
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Int(_) => 1,
            Self::Real(_) => 2,
            Self::Date(_) => 3,
            Self::Time(_) => 4,
            Self::Text(_) => 5,
        }
    }

    /// Coerce the value into the representation of `kind`.
    ///
    /// Text is parsed (form input arrives as strings), blank text becomes
    /// [`Value::Null`], integers widen to reals, and reals narrow to integers
    /// only when they carry no fractional part. Domain and bound checks are
    /// not performed here; see [`FieldKind::check`].
    ///
    /// # Errors
    /// Returns a human-readable constraint description when the value cannot
    /// represent the kind.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::float_cmp
    )]
    pub fn coerce(self, kind: &FieldKind) -> std::result::Result<Self, String> {
        match (self, kind) {
            (Self::Null, _) => Ok(Self::Null),
            (Self::Text(s), kind) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(Self::Null);
                }
                match kind {
                    FieldKind::Identifier | FieldKind::Text | FieldKind::Categorical { .. } => {
                        Ok(Self::Text(trimmed.to_string()))
                    }
                    FieldKind::Integer { .. } => trimmed
                        .parse::<i64>()
                        .map(Self::Int)
                        .or_else(|_| match trimmed.parse::<f64>() {
                            Ok(r) => Self::Real(r).coerce(kind),
                            Err(_) => Err(format!("'{trimmed}' is not an integer")),
                        }),
                    FieldKind::Real { .. } => match trimmed.parse::<f64>() {
                        Ok(r) => Self::Real(r).coerce(kind),
                        Err(_) => Err(format!("'{trimmed}' is not a number")),
                    },
                    FieldKind::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                        .map(Self::Date)
                        .map_err(|_| format!("'{trimmed}' is not a date (expected YYYY-MM-DD)")),
                    FieldKind::Time => NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
                        .map(Self::Time)
                        .map_err(|_| format!("'{trimmed}' is not a time (expected HH:MM:SS)")),
                }
            }
            (Self::Int(i), FieldKind::Integer { .. }) => Ok(Self::Int(i)),
            (Self::Int(i), FieldKind::Real { .. }) => Ok(Self::Real(i as f64)),
            (Self::Int(i), FieldKind::Identifier | FieldKind::Text | FieldKind::Categorical { .. }) => {
                Ok(Self::Text(i.to_string()))
            }
            (Self::Real(r), _) if !r.is_finite() => Err(format!("{r} is not a finite number")),
            (Self::Real(r), FieldKind::Real { .. }) => Ok(Self::Real(r)),
            (Self::Real(r), FieldKind::Integer { .. }) => {
                if r.fract() == 0.0 && r >= i64::MIN as f64 && r <= i64::MAX as f64 {
                    Ok(Self::Int(r as i64))
                } else {
                    Err(format!("{r} is not an integer"))
                }
            }
            (Self::Date(d), FieldKind::Date) => Ok(Self::Date(d)),
            (Self::Time(t), FieldKind::Time) => Ok(Self::Time(t)),
            (value, kind) => Err(format!("{} value '{value}' does not fit a {} field", value.type_name(), kind.type_name())),
        }
    }

    /// Short name of the value's variant, for error messages
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
        }
    }
}

impl Ord for Value {
    #[allow(clippy::cast_precision_loss)]
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Real(a), Self::Real(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Real(b)) => (*a as f64)
                .total_cmp(b)
                .then(Ordering::Less),
            (Self::Real(a), Self::Int(b)) => a
                .total_cmp(&(*b as f64))
                .then(Ordering::Greater),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Int(i) => i.hash(state),
            Self::Real(r) => r.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
            Self::Date(d) => d.hash(state),
            Self::Time(t) => t.hash(state),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Self::Real(r)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Self::Time(t)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
