//! Ordinary least squares regression
//!
//! **Fit pipeline**:
//! 1. Keep complete rows (no null in any feature or the target)
//! 2. Shuffle row indices with a seeded `StdRng`, split off an evaluation partition
//! 3. Centre the training data and solve the normal equations by Gaussian
//!    elimination with partial pivoting
//!
//! The predictor is stateless: the same dataset snapshot and configuration
//! always produce the same split and the same coefficients.
//!
//! # Example
//!
//! ```rust
//! use ledger_insight::dataset::Dataset;
//! use ledger_insight::regression::{RegressionConfig, RegressionPredictor};
//! use ledger_insight::schema::{catalog, RawRecord};
//!
//! # fn main() -> ledger_insight::Result<()> {
//! let schema = catalog::insurance();
//! let records = (0..10)
//!     .map(|i| {
//!         schema.validate(
//!             RawRecord::new()
//!                 .set("Name", format!("P{i}"))
//!                 .set("Age", 20 + 5 * i)
//!                 .set("Health_Risk_Score", 1.0)
//!                 .set("Premium_Amount", 100.0 + 10.0 * f64::from(i))
//!                 .set("Claim_Amount", 0.0),
//!         )
//!     })
//!     .collect::<ledger_insight::Result<Vec<_>>>()?;
//! let dataset = Dataset::from_records(schema, &records)?;
//!
//! let predictor = RegressionPredictor::new(RegressionConfig::default());
//! let model = predictor.fit(&dataset, &["Age"], "Premium_Amount")?;
//! let premium = model.predict(&[50.0])?;
//! assert!((premium - 160.0).abs() < 1e-6);
//! # Ok(())
//! # }
//! ```

use crate::dataset::Dataset;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Seed used when none is configured
pub const DEFAULT_SEED: u64 = 42;
/// Share of complete rows held out for evaluation
pub const DEFAULT_EVALUATION_FRACTION: f64 = 0.2;
/// Fewest complete rows a fit accepts
pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// Relative pivot size below which the normal equations are singular
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Regression settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// Seed of the partition shuffle
    pub seed: u64,
    /// Share of complete rows used for evaluation, in (0, 1)
    pub evaluation_fraction: f64,
    /// Fewest complete rows accepted; never below 2
    pub min_samples: usize,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            evaluation_fraction: DEFAULT_EVALUATION_FRACTION,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }
}

impl RegressionConfig {
    /// Set the shuffle seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the evaluation fraction
    #[must_use]
    pub const fn with_evaluation_fraction(mut self, fraction: f64) -> Self {
        self.evaluation_fraction = fraction;
        self
    }

    /// Set the minimum sample count
    #[must_use]
    pub const fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Check the settings are usable.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if the evaluation fraction is outside
    /// (0, 1) or `min_samples` is below 2
    pub fn validate(&self) -> Result<()> {
        if !(self.evaluation_fraction > 0.0 && self.evaluation_fraction < 1.0) {
            return Err(Error::InvalidInput(format!(
                "evaluation_fraction must be in (0, 1), got {}",
                self.evaluation_fraction
            )));
        }
        if self.min_samples < 2 {
            return Err(Error::InvalidInput(format!(
                "min_samples must be at least 2, got {}",
                self.min_samples
            )));
        }
        Ok(())
    }
}

/// Feature rows with their targets
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Samples {
    features: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl Samples {
    /// Samples from parallel feature rows and targets.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if the lengths differ, a value is not
    /// finite, or the rows have different widths
    pub fn new(features: Vec<Vec<f64>>, targets: Vec<f64>) -> Result<Self> {
        if features.len() != targets.len() {
            return Err(Error::InvalidInput(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }
        if let Some(width) = features.first().map(Vec::len) {
            if features.iter().any(|row| row.len() != width) {
                return Err(Error::InvalidInput("feature rows have different widths".to_string()));
            }
        }
        if features.iter().flatten().chain(&targets).any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput("samples must be finite".to_string()));
        }
        Ok(Self { features, targets })
    }

    fn from_rows(dataset: &Dataset, feature_cols: &[usize], target_col: usize, rows: &[usize]) -> Self {
        let mut features = Vec::with_capacity(rows.len());
        let mut targets = Vec::with_capacity(rows.len());
        for &row in rows {
            let xs: Option<Vec<f64>> = feature_cols.iter().map(|&c| dataset.numeric(row, c)).collect();
            if let (Some(xs), Some(y)) = (xs, dataset.numeric(row, target_col)) {
                features.push(xs);
                targets.push(y);
            }
        }
        Self { features, targets }
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether there are no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Feature rows
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Targets, aligned with [`features`](Self::features)
    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }
}

/// Deterministic split of the complete rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partition {
    /// Rows the model is fitted on
    pub training: Samples,
    /// Held-out rows
    pub evaluation: Samples,
}

/// Quality of a model on held-out samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    /// Mean of squared residuals
    pub mean_squared_error: f64,
    /// Coefficient of determination; `None` when the targets are constant
    pub r_squared: Option<f64>,
    /// Number of samples evaluated
    pub samples: usize,
}

/// Fitted linear model `target = intercept + Σ coefficient_i * feature_i`.
///
/// Valid only for the dataset snapshot whose fingerprint it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    features: Vec<String>,
    target: String,
    coefficients: Vec<f64>,
    intercept: f64,
    fingerprint: u64,
    training_rows: usize,
    evaluation_rows: usize,
}

impl RegressionModel {
    /// Feature names, in coefficient order
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Target name
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Coefficients, aligned with [`features`](Self::features)
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Intercept term
    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Fingerprint of the training snapshot
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Rows used for fitting
    #[must_use]
    pub const fn training_rows(&self) -> usize {
        self.training_rows
    }

    /// Rows held out for evaluation
    #[must_use]
    pub const fn evaluation_rows(&self) -> usize {
        self.evaluation_rows
    }

    /// Whether the model was trained on this exact snapshot
    #[must_use]
    pub fn is_valid_for(&self, dataset: &Dataset) -> bool {
        self.fingerprint == dataset.fingerprint()
    }

    /// Predict the target for one feature vector.
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] if the arity differs from the
    /// model and [`Error::InvalidInput`] for non-finite inputs
    pub fn predict(&self, feature_values: &[f64]) -> Result<f64> {
        if feature_values.len() != self.coefficients.len() {
            return Err(Error::DimensionMismatch {
                expected: self.coefficients.len(),
                actual: feature_values.len(),
            });
        }
        if let Some(bad) = feature_values.iter().find(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(format!("feature value {bad} is not finite")));
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(feature_values)
                .map(|(b, x)| b * x)
                .sum::<f64>())
    }

    /// Score the model on `samples`.
    ///
    /// # Errors
    /// Returns [`Error::Computation`] for an empty sample set and
    /// [`Error::DimensionMismatch`] if the sample width differs from the model
    #[allow(clippy::cast_precision_loss)]
    pub fn evaluate(&self, samples: &Samples) -> Result<Evaluation> {
        if samples.is_empty() {
            return Err(Error::Computation("cannot evaluate on zero samples".to_string()));
        }
        let n = samples.len() as f64;
        let mean = samples.targets.iter().sum::<f64>() / n;
        let (mut ss_res, mut ss_tot, mut ss_raw) = (0.0, 0.0, 0.0);
        for (xs, y) in samples.features.iter().zip(&samples.targets) {
            let residual = y - self.predict(xs)?;
            ss_res += residual * residual;
            ss_tot += (y - mean).powi(2);
            ss_raw += y * y;
        }
        // Variance is judged relative to the targets' magnitude
        Ok(Evaluation {
            mean_squared_error: ss_res / n,
            r_squared: (ss_tot > f64::EPSILON * ss_raw).then(|| 1.0 - ss_res / ss_tot),
            samples: samples.len(),
        })
    }
}

/// Fits [`RegressionModel`]s on dataset snapshots
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionPredictor {
    config: RegressionConfig,
}

impl Default for RegressionPredictor {
    fn default() -> Self {
        Self::new(RegressionConfig::default())
    }
}

impl RegressionPredictor {
    /// Create a predictor; `min_samples` is raised to 2 if lower
    #[must_use]
    pub fn new(config: RegressionConfig) -> Self {
        Self {
            config: config.with_min_samples(config.min_samples.max(2)),
        }
    }

    /// Active settings
    #[must_use]
    pub const fn config(&self) -> &RegressionConfig {
        &self.config
    }

    fn resolve<S: AsRef<str>>(dataset: &Dataset, features: &[S], target: &str) -> Result<(Vec<usize>, usize)> {
        if features.is_empty() {
            return Err(Error::InvalidInput("regression needs at least one feature".to_string()));
        }
        let schema = dataset.schema();
        let numeric = |name: &str| {
            let (col, spec) = schema.resolve(name)?;
            if spec.kind().is_numeric() {
                Ok(col)
            } else {
                Err(Error::schema_mismatch(
                    name,
                    format!("regression needs a numeric field, found {}", spec.kind().type_name()),
                ))
            }
        };
        let feature_cols = features
            .iter()
            .map(|f| numeric(f.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok((feature_cols, numeric(target)?))
    }

    /// Split the complete rows into training and evaluation samples.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] for unknown or non-numeric fields and
    /// [`Error::InsufficientData`] when too few complete rows remain or the
    /// target is constant
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn partition<S: AsRef<str>>(&self, dataset: &Dataset, features: &[S], target: &str) -> Result<Partition> {
        let (feature_cols, target_col) = Self::resolve(dataset, features, target)?;

        let mut rows: Vec<usize> = (0..dataset.len())
            .filter(|&row| {
                dataset.numeric(row, target_col).is_some()
                    && feature_cols.iter().all(|&c| dataset.numeric(row, c).is_some())
            })
            .collect();
        let n = rows.len();
        if n < self.config.min_samples {
            return Err(Error::InsufficientData(format!(
                "{n} complete row(s) for '{target}', need at least {}",
                self.config.min_samples
            )));
        }

        let first = dataset.numeric(rows[0], target_col);
        if rows.iter().all(|&row| dataset.numeric(row, target_col) == first) {
            return Err(Error::InsufficientData(format!("'{target}' is constant over the matched rows")));
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        rows.shuffle(&mut rng);

        let held_out = ((n as f64 * self.config.evaluation_fraction).ceil() as usize).clamp(1, n - 1);
        let (evaluation, training) = rows.split_at(held_out);

        Ok(Partition {
            training: Samples::from_rows(dataset, &feature_cols, target_col, training),
            evaluation: Samples::from_rows(dataset, &feature_cols, target_col, evaluation),
        })
    }

    /// Fit `target ~ features` on the training partition.
    ///
    /// # Errors
    /// Returns any error of [`partition`](Self::partition), and
    /// [`Error::InsufficientData`] when the features are constant or collinear
    pub fn fit<S: AsRef<str>>(&self, dataset: &Dataset, features: &[S], target: &str) -> Result<RegressionModel> {
        self.fit_with_evaluation(dataset, features, target)
            .map(|(model, _)| model)
    }

    /// Fit and score the model on the held-out partition.
    ///
    /// # Errors
    /// Same as [`fit`](Self::fit)
    pub fn fit_with_evaluation<S: AsRef<str>>(
        &self,
        dataset: &Dataset,
        features: &[S],
        target: &str,
    ) -> Result<(RegressionModel, Evaluation)> {
        let partition = self.partition(dataset, features, target)?;
        let (coefficients, intercept) = ordinary_least_squares(&partition.training)?;

        let model = RegressionModel {
            features: features.iter().map(|f| f.as_ref().to_string()).collect(),
            target: target.to_string(),
            coefficients,
            intercept,
            fingerprint: dataset.fingerprint(),
            training_rows: partition.training.len(),
            evaluation_rows: partition.evaluation.len(),
        };
        let evaluation = model.evaluate(&partition.evaluation)?;

        debug!(
            features = ?model.features,
            target_field = %model.target,
            training_rows = model.training_rows,
            evaluation_rows = model.evaluation_rows,
            mse = evaluation.mean_squared_error,
            "fitted regression model"
        );
        Ok((model, evaluation))
    }

    /// Predict with `model`.
    ///
    /// # Errors
    /// See [`RegressionModel::predict`]
    pub fn predict(&self, model: &RegressionModel, feature_values: &[f64]) -> Result<f64> {
        model.predict(feature_values)
    }

    /// Score `model` on `samples`.
    ///
    /// # Errors
    /// See [`RegressionModel::evaluate`]
    pub fn evaluate(&self, model: &RegressionModel, samples: &Samples) -> Result<Evaluation> {
        model.evaluate(samples)
    }
}

/// Solve centred normal equations; returns (coefficients, intercept)
#[allow(clippy::cast_precision_loss, clippy::needless_range_loop)]
fn ordinary_least_squares(samples: &Samples) -> Result<(Vec<f64>, f64)> {
    let n = samples.len();
    let p = samples.features.first().map_or(0, Vec::len);
    if n == 0 || p == 0 {
        return Err(Error::InsufficientData("no training samples".to_string()));
    }

    let nf = n as f64;
    let x_mean: Vec<f64> = (0..p)
        .map(|j| samples.features.iter().map(|row| row[j]).sum::<f64>() / nf)
        .collect();
    let y_mean = samples.targets.iter().sum::<f64>() / nf;

    // Augmented system [XᵀX | Xᵀy] over centred data
    let mut a = vec![vec![0.0; p + 1]; p];
    for (row, y) in samples.features.iter().zip(&samples.targets) {
        let dy = y - y_mean;
        for i in 0..p {
            let di = row[i] - x_mean[i];
            for j in 0..p {
                a[i][j] += di * (row[j] - x_mean[j]);
            }
            a[i][p] += di * dy;
        }
    }

    let scale = (0..p).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    let magnitude = (0..p)
        .map(|i| samples.features.iter().map(|row| row[i] * row[i]).sum::<f64>())
        .fold(0.0, f64::max);
    if scale <= f64::EPSILON * magnitude {
        return Err(Error::InsufficientData("features are constant".to_string()));
    }

    for col in 0..p {
        let pivot = (col..p)
            .max_by(|&r, &s| a[r][col].abs().total_cmp(&a[s][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() <= PIVOT_TOLERANCE * scale {
            return Err(Error::InsufficientData(
                "features are constant or collinear (singular design)".to_string(),
            ));
        }
        a.swap(col, pivot);
        for r in (col + 1)..p {
            let factor = a[r][col] / a[col][col];
            for c in col..=p {
                a[r][c] -= factor * a[col][c];
            }
        }
    }

    let mut beta = vec![0.0; p];
    for i in (0..p).rev() {
        let tail: f64 = ((i + 1)..p).map(|j| a[i][j] * beta[j]).sum();
        beta[i] = (a[i][p] - tail) / a[i][i];
    }

    let intercept = y_mean - beta.iter().zip(&x_mean).map(|(b, m)| b * m).sum::<f64>();
    Ok((beta, intercept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, RawRecord, Schema};
    use std::sync::Arc;

    fn dataset(rows: &[(f64, f64, Option<f64>)]) -> Dataset {
        let schema = Arc::new(
            Schema::builder("samples")
                .required("x1", FieldKind::real(None, None))
                .required("x2", FieldKind::real(None, None))
                .optional("y", FieldKind::real(None, None))
                .optional("label", FieldKind::Text)
                .build()
                .unwrap(),
        );
        let records: Vec<_> = rows
            .iter()
            .map(|&(x1, x2, y)| {
                schema
                    .validate(RawRecord::new().set("x1", x1).set("x2", x2).set("y", y))
                    .unwrap()
            })
            .collect();
        Dataset::from_records(schema, &records).unwrap()
    }

    fn plane(n: usize) -> Dataset {
        let rows: Vec<_> = (0..n)
            .map(|i| {
                let a = i as f64;
                let b = ((i * i) % 7) as f64;
                (a, b, Some(2.0 * a + 3.0 * b + 1.0))
            })
            .collect();
        dataset(&rows)
    }

    #[test]
    fn test_recovers_exact_plane() {
        let predictor = RegressionPredictor::default();
        let (model, eval) = predictor.fit_with_evaluation(&plane(12), &["x1", "x2"], "y").unwrap();
        assert!((model.coefficients()[0] - 2.0).abs() < 1e-9);
        assert!((model.coefficients()[1] - 3.0).abs() < 1e-9);
        assert!((model.intercept() - 1.0).abs() < 1e-9);
        assert!(eval.mean_squared_error < 1e-12);
        assert_eq!(model.training_rows() + model.evaluation_rows(), 12);
    }

    #[test]
    fn test_tiny_magnitudes_fit_and_score() {
        let unit = 1e-9;
        let rows: Vec<_> = (0..12)
            .map(|i| {
                let a = i as f64 * unit;
                let b = ((i * i) % 7) as f64 * unit;
                (a, b, Some(2.0 * a + 3.0 * b + unit))
            })
            .collect();
        let predictor = RegressionPredictor::default();
        let model = predictor.fit(&dataset(&rows), &["x1", "x2"], "y").unwrap();
        assert!((model.coefficients()[0] - 2.0).abs() < 1e-6);
        assert!((model.coefficients()[1] - 3.0).abs() < 1e-6);

        let samples = Samples::new(
            vec![vec![unit, unit], vec![2.0 * unit, 4.0 * unit], vec![3.0 * unit, 2.0 * unit]],
            vec![6.0 * unit, 17.0 * unit, 13.0 * unit],
        )
        .unwrap();
        let eval = predictor.evaluate(&model, &samples).unwrap();
        assert!(eval.r_squared.unwrap() > 0.999);
    }

    #[test]
    fn test_constant_feature_at_large_offset_is_insufficient() {
        let rows: Vec<_> = (0..8).map(|i| (1e6, 0.0, Some(f64::from(i)))).collect();
        let err = RegressionPredictor::default().fit(&dataset(&rows), &["x1"], "y").unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_partition_sizes_and_determinism() {
        let predictor = RegressionPredictor::default();
        let data = plane(10);
        let first = predictor.partition(&data, &["x1"], "y").unwrap();
        assert_eq!(first.evaluation.len(), 2);
        assert_eq!(first.training.len(), 8);
        assert_eq!(predictor.partition(&data, &["x1"], "y").unwrap(), first);
    }

    #[test]
    fn test_incomplete_rows_are_skipped() {
        let mut rows: Vec<_> = (0..6).map(|i| (f64::from(i), 0.0, Some(f64::from(i) * 4.0))).collect();
        rows.push((99.0, 0.0, None));
        let model = RegressionPredictor::default()
            .fit(&dataset(&rows), &["x1"], "y")
            .unwrap();
        assert_eq!(model.training_rows() + model.evaluation_rows(), 6);
        assert!((model.predict(&[10.0]).unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_record_is_insufficient() {
        let err = RegressionPredictor::default()
            .fit(&dataset(&[(1.0, 1.0, Some(1.0))]), &["x1"], "y")
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));

        let lenient = RegressionPredictor::new(RegressionConfig::default().with_min_samples(0));
        assert_eq!(lenient.config().min_samples, 2);
        let err = lenient.fit(&dataset(&[(1.0, 1.0, Some(1.0))]), &["x1"], "y").unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_constant_target_is_insufficient() {
        let rows: Vec<_> = (0..8).map(|i| (f64::from(i), 0.0, Some(5.0))).collect();
        let err = RegressionPredictor::default().fit(&dataset(&rows), &["x1"], "y").unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_collinear_features_are_singular() {
        let rows: Vec<_> = (0..8)
            .map(|i| (f64::from(i), 2.0 * f64::from(i), Some(f64::from(i * i))))
            .collect();
        let err = RegressionPredictor::default()
            .fit(&dataset(&rows), &["x1", "x2"], "y")
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));

        let err = RegressionPredictor::default().fit(&dataset(&rows), &["x1", "x1"], "y").unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_field_checks() {
        let data = plane(8);
        let predictor = RegressionPredictor::default();
        assert!(matches!(
            predictor.fit(&data, &["label"], "y"),
            Err(Error::SchemaMismatch { .. })
        ));
        assert!(matches!(
            predictor.fit(&data, &["x9"], "y"),
            Err(Error::SchemaMismatch { .. })
        ));
        assert!(matches!(
            predictor.fit::<&str>(&data, &[], "y"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_predict_input_checks() {
        let predictor = RegressionPredictor::default();
        let model = predictor.fit(&plane(10), &["x1", "x2"], "y").unwrap();
        assert!(matches!(
            predictor.predict(&model, &[1.0]),
            Err(Error::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            predictor.predict(&model, &[1.0, f64::NAN]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_evaluate_edge_cases() {
        let predictor = RegressionPredictor::default();
        let model = predictor.fit(&plane(10), &["x1", "x2"], "y").unwrap();

        let err = predictor.evaluate(&model, &Samples::default()).unwrap_err();
        assert!(matches!(err, Error::Computation(_)));

        let constant = Samples::new(vec![vec![0.0, 0.0], vec![0.0, 0.0]], vec![1.0, 1.0]).unwrap();
        let eval = predictor.evaluate(&model, &constant).unwrap();
        assert_eq!(eval.r_squared, None);
        assert!(eval.mean_squared_error < 1e-12);

        assert!(Samples::new(vec![vec![1.0]], vec![]).is_err());
    }

    #[test]
    fn test_model_tracks_snapshot() {
        let data = plane(10);
        let model = RegressionPredictor::default().fit(&data, &["x1", "x2"], "y").unwrap();
        assert!(model.is_valid_for(&data));
        assert!(!model.is_valid_for(&plane(11)));
    }

    #[test]
    fn test_config_validation() {
        assert!(RegressionConfig::default().validate().is_ok());
        assert!(RegressionConfig::default().with_evaluation_fraction(1.0).validate().is_err());
        assert!(RegressionConfig::default().with_evaluation_fraction(f64::NAN).validate().is_err());
        assert!(RegressionConfig::default().with_min_samples(1).validate().is_err());
    }
}
