//! Descriptive statistics over numeric fields
//!
//! - [`describe`]: count, mean, sample standard deviation, min, quartiles, max
//! - [`correlation_matrix`]: pairwise Pearson correlation
//!
//! Quartiles use linear interpolation between closest ranks, the usual
//! dataframe convention. Nulls are skipped everywhere.

use crate::dataset::Dataset;
use crate::{Error, Result};
use serde::Serialize;
use tracing::debug;

/// Summary of one numeric field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    /// Field name
    pub field: String,
    /// Non-null values
    pub count: usize,
    /// Arithmetic mean
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1); needs two values
    pub std: Option<f64>,
    /// Smallest value
    pub min: Option<f64>,
    /// 25th percentile
    pub q1: Option<f64>,
    /// 50th percentile
    pub median: Option<f64>,
    /// 75th percentile
    pub q3: Option<f64>,
    /// Largest value
    pub max: Option<f64>,
}

impl SummaryStats {
    #[allow(clippy::cast_precision_loss)]
    fn from_values(field: &str, mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        let n = values.len();
        let mean = (n > 0).then(|| values.iter().sum::<f64>() / n as f64);
        let std = mean.filter(|_| n > 1).map(|m| {
            let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        });
        Self {
            field: field.to_string(),
            count: n,
            mean,
            std,
            min: values.first().copied(),
            q1: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q3: quantile(&values, 0.75),
            max: values.last().copied(),
        }
    }
}

/// Quantile of sorted values with linear interpolation
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = q * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Summary statistics of every numeric field, in schema order
#[must_use]
pub fn describe(dataset: &Dataset) -> Vec<SummaryStats> {
    dataset
        .schema()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| f.kind().is_numeric())
        .map(|(col, f)| {
            let values = (0..dataset.len())
                .filter_map(|row| dataset.numeric(row, col))
                .collect();
            SummaryStats::from_values(f.name(), values)
        })
        .collect()
}

/// Pairwise Pearson correlations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    fields: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Fields labelling rows and columns
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Correlation of two fields; `None` when undefined (constant input or
    /// fewer than two complete pairs)
    #[must_use]
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.fields.iter().position(|f| f == a)?;
        let j = self.fields.iter().position(|f| f == b)?;
        self.values[i][j]
    }

    /// Matrix rows, aligned with [`fields`](Self::fields)
    #[must_use]
    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.values
    }
}

/// Pearson correlation matrix over `fields`, or over every numeric field
/// when `fields` is empty.
///
/// Each pair uses the rows where both values are present.
///
/// # Errors
/// Returns [`Error::SchemaMismatch`] if a field is unknown or not numeric
pub fn correlation_matrix<S: AsRef<str>>(dataset: &Dataset, fields: &[S]) -> Result<CorrelationMatrix> {
    let schema = dataset.schema();
    let columns: Vec<(usize, String)> = if fields.is_empty() {
        schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| f.kind().is_numeric())
            .map(|(i, f)| (i, f.name().to_string()))
            .collect()
    } else {
        fields
            .iter()
            .map(|name| {
                let (col, spec) = schema.resolve(name.as_ref())?;
                if spec.kind().is_numeric() {
                    Ok((col, spec.name().to_string()))
                } else {
                    Err(Error::schema_mismatch(
                        spec.name(),
                        format!("correlation needs a numeric field, found {}", spec.kind().type_name()),
                    ))
                }
            })
            .collect::<Result<_>>()?
    };

    let series: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|(col, _)| (0..dataset.len()).map(|row| dataset.numeric(row, *col)).collect())
        .collect();

    let k = columns.len();
    let mut values = vec![vec![None; k]; k];
    for i in 0..k {
        for j in i..k {
            let r = pearson(&series[i], &series[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    debug!(kind = schema.name(), fields = k, rows = dataset.len(), "computed correlations");
    Ok(CorrelationMatrix {
        fields: columns.into_iter().map(|(_, name)| name).collect(),
        values,
    })
}

#[allow(clippy::cast_precision_loss)]
fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    let (mut xx, mut yy) = (0.0, 0.0);
    for (x, y) in &pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
        xx += x * x;
        yy += y * y;
    }
    // Constant relative to the values' own magnitude
    if sxx <= f64::EPSILON * xx || syy <= f64::EPSILON * yy {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}
