//! Query results handed to the presentation layer

use crate::regression::{Evaluation, RegressionModel};
use serde::Serialize;
use std::sync::Arc;

/// Result of a named query.
///
/// Distinguishes "nothing matched" and "this dataset lacks the fields the
/// query needs" from a populated result, so a caller never renders an empty
/// chart without a reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "result", rename_all = "snake_case")]
pub enum QueryOutcome<T> {
    /// Populated result
    Found(T),
    /// The query's input narrowed to no records
    NoDataMatched,
    /// The schema lacks fields the query needs
    FeatureUnavailable {
        /// Missing field names, in request order
        missing: Vec<String>,
    },
}

impl<T> QueryOutcome<T> {
    /// Whether a result was produced
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The result, if any
    #[must_use]
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    /// Borrow the result, if any
    #[must_use]
    pub const fn as_found(&self) -> Option<&T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    /// Transform a populated result
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> QueryOutcome<U> {
        match self {
            Self::Found(value) => QueryOutcome::Found(f(value)),
            Self::NoDataMatched => QueryOutcome::NoDataMatched,
            Self::FeatureUnavailable { missing } => QueryOutcome::FeatureUnavailable { missing },
        }
    }
}

/// Point prediction with the model that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Model fitted on the queried snapshot (shared with the cache)
    pub model: Arc<RegressionModel>,
    /// Predicted target value
    pub value: f64,
    /// Held-out quality, when requested
    pub evaluation: Option<Evaluation>,
}

/// Inputs of a prediction query
#[derive(Debug, Clone, PartialEq)]
pub struct PredictRequest {
    /// Feature field names
    pub features: Vec<String>,
    /// Target field name
    pub target: String,
    /// Feature values to predict for, aligned with `features`
    pub values: Vec<f64>,
    /// Attach the held-out evaluation to the prediction
    pub include_evaluation: bool,
}

impl PredictRequest {
    /// Request a prediction of `target` from `features` at `values`
    #[must_use]
    pub fn new<I, S>(features: I, target: impl Into<String>, values: Vec<f64>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            target: target.into(),
            values,
            include_evaluation: false,
        }
    }

    /// Also report how well the model fits held-out rows
    #[must_use]
    pub const fn with_fit(mut self) -> Self {
        self.include_evaluation = true;
        self
    }
}
