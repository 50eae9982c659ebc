//! Named dashboard queries
//!
//! Each operation is a small composition of filter, aggregate, statistics and
//! regression over an explicit [`Dataset`] handle. Every operation starts with
//! one schema-presence check; absent fields produce
//! [`QueryOutcome::FeatureUnavailable`] instead of an error.
//!
//! Fitted models are cached per `(features, target)`. Each entry remembers
//! the snapshot it was fitted on (fingerprint and row count): repeated
//! predictions on an unchanged snapshot reuse one model, and a fit on another
//! snapshot replaces the entry, so the cache holds at most one model per
//! distinct request shape however many filtered subsets are queried.
//!
//! # Example
//!
//! ```rust
//! use ledger_insight::orchestrator::{QueryOrchestrator, QueryOutcome};
//! use ledger_insight::schema::{catalog, RawRecord};
//! use ledger_insight::storage::{MemoryRecordStore, RecordStore};
//!
//! # fn main() -> ledger_insight::Result<()> {
//! let store = MemoryRecordStore::new(catalog::insurance());
//! let orchestrator = QueryOrchestrator::default();
//! for (name, defaulter) in [("Asha", 0), ("Dev", 1)] {
//!     orchestrator.ingest(
//!         &store,
//!         RawRecord::new()
//!             .set("Name", name)
//!             .set("Age", 40)
//!             .set("Health_Risk_Score", 3.0)
//!             .set("Premium_Amount", 800.0)
//!             .set("Claim_Amount", 100.0)
//!             .set("Is_Defaulter", defaulter),
//!     )?;
//! }
//!
//! let dataset = store.load();
//! let defaulters = orchestrator.list_by_flag(&dataset, "Is_Defaulter", 1)?;
//! assert_eq!(defaulters.found().map(|d| d.len()), Some(1));
//!
//! let missing = orchestrator.distribution(&dataset, "Traffic")?;
//! assert!(matches!(missing, QueryOutcome::FeatureUnavailable { .. }));
//! # Ok(())
//! # }
//! ```

mod outcome;

pub use outcome::{PredictRequest, Prediction, QueryOutcome};

use crate::aggregate::{AggregateTable, AggregationEngine, AggregationSpec};
use crate::config::PipelineConfig;
use crate::dataset::{hour_field_name, Dataset};
use crate::filter::{FilterEngine, Predicate};
use crate::regression::{Evaluation, RegressionConfig, RegressionModel, RegressionPredictor};
use crate::schema::{RawRecord, Record, Value};
use crate::stats::{self, CorrelationMatrix, SummaryStats};
use crate::storage::RecordStore;
use crate::{Error, Result};
use dashmap::DashMap;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// Cache key of a fitted model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    features: Vec<String>,
    target: String,
}

impl ModelKey {
    fn new(features: &[String], target: &str) -> Self {
        Self {
            features: features.to_vec(),
            target: target.to_string(),
        }
    }
}

/// Identity of the dataset a model was fitted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snapshot {
    fingerprint: u64,
    rows: usize,
}

impl Snapshot {
    fn of(dataset: &Dataset) -> Self {
        Self {
            fingerprint: dataset.fingerprint(),
            rows: dataset.len(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedFit {
    snapshot: Snapshot,
    model: Arc<RegressionModel>,
    evaluation: Evaluation,
}

/// Entry point for dashboard queries
#[derive(Debug, Default)]
pub struct QueryOrchestrator {
    predictor: RegressionPredictor,
    models: DashMap<ModelKey, CachedFit>,
}

impl QueryOrchestrator {
    /// Create an orchestrator fitting with `config`
    #[must_use]
    pub fn new(config: RegressionConfig) -> Self {
        Self {
            predictor: RegressionPredictor::new(config),
            models: DashMap::new(),
        }
    }

    /// Create an orchestrator from pipeline settings.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if the settings are invalid
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.regression))
    }

    /// Number of cached models
    #[must_use]
    pub fn cached_models(&self) -> usize {
        self.models.len()
    }

    /// Drop every cached model
    pub fn clear_cache(&self) {
        self.models.clear();
    }

    /// Fields of `required` absent from the schema, as an outcome
    fn require_fields<'a, T, I>(dataset: &Dataset, required: I) -> Option<QueryOutcome<T>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let schema = dataset.schema();
        let missing: Vec<String> = required
            .into_iter()
            .filter(|name| schema.field(name).is_none())
            .map(str::to_string)
            .collect();
        if missing.is_empty() {
            None
        } else {
            debug!(kind = schema.name(), ?missing, "query fields unavailable");
            Some(QueryOutcome::FeatureUnavailable { missing })
        }
    }

    fn non_empty(dataset: Dataset) -> QueryOutcome<Dataset> {
        if dataset.is_empty() {
            QueryOutcome::NoDataMatched
        } else {
            QueryOutcome::Found(dataset)
        }
    }

    /// Records whose identifier contains `query`, ignoring case.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] for a blank query
    pub fn lookup_by_identifier(&self, dataset: &Dataset, query: &str) -> Result<QueryOutcome<Dataset>> {
        let Some(field) = dataset.schema().identifier() else {
            return Ok(QueryOutcome::FeatureUnavailable {
                missing: vec!["identifier".to_string()],
            });
        };
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("identifier query is blank".to_string()));
        }
        FilterEngine::apply(dataset, &[Predicate::contains(field, query)]).map(Self::non_empty)
    }

    /// Records whose `flag_field` equals `flag_value`, e.g. the defaulters list.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] if the value cannot be compared with the field
    pub fn list_by_flag(
        &self,
        dataset: &Dataset,
        flag_field: &str,
        flag_value: impl Into<Value>,
    ) -> Result<QueryOutcome<Dataset>> {
        if let Some(outcome) = Self::require_fields(dataset, [flag_field]) {
            return Ok(outcome);
        }
        FilterEngine::apply(dataset, &[Predicate::equals(flag_field, flag_value)]).map(Self::non_empty)
    }

    /// Records satisfying every predicate (sidebar filters).
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] for predicates that do not fit their field
    pub fn filter(&self, dataset: &Dataset, predicates: &[Predicate]) -> Result<QueryOutcome<Dataset>> {
        if let Some(outcome) = Self::require_fields(dataset, predicates.iter().map(|p| p.field.as_str())) {
            return Ok(outcome);
        }
        FilterEngine::apply(dataset, predicates).map(Self::non_empty)
    }

    /// Mean of `value_field` per value of `group_field`.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] for a non-numeric value field and
    /// [`Error::Computation`] when a group has no values to average
    pub fn factor_impact(
        &self,
        dataset: &Dataset,
        group_field: &str,
        value_field: &str,
    ) -> Result<QueryOutcome<AggregateTable>> {
        self.breakdown(dataset, &AggregationSpec::mean_by(group_field, value_field))
    }

    /// [`factor_impact`](Self::factor_impact) for several grouping fields,
    /// in request order. Each factor's outcome is independent.
    ///
    /// # Errors
    /// Returns the first hard error of any factor
    pub fn factor_impacts<S>(
        &self,
        dataset: &Dataset,
        group_fields: &[S],
        value_field: &str,
    ) -> Result<Vec<(String, QueryOutcome<AggregateTable>)>>
    where
        S: AsRef<str> + Sync,
    {
        let impact = |field: &S| -> Result<(String, QueryOutcome<AggregateTable>)> {
            let field = field.as_ref();
            Ok((field.to_string(), self.factor_impact(dataset, field, value_field)?))
        };

        #[cfg(feature = "rayon")]
        let impacts = group_fields.par_iter().map(impact).collect();
        #[cfg(not(feature = "rayon"))]
        let impacts = group_fields.iter().map(impact).collect();

        impacts
    }

    /// Number of records per hour of day of `time_field`, e.g. peak order
    /// hours. Records without a time count under the null hour.
    ///
    /// The hour comes from [`Dataset::with_hour_of`]; use that directly to
    /// correlate or regress on the derived field.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] if `time_field` is not a time field
    pub fn orders_by_hour(&self, dataset: &Dataset, time_field: &str) -> Result<QueryOutcome<AggregateTable>> {
        if let Some(outcome) = Self::require_fields(dataset, [time_field]) {
            return Ok(outcome);
        }
        let with_hour = dataset.with_hour_of(time_field)?;
        self.distribution(&with_hour, &hour_field_name(time_field))
    }

    /// Number of records per value of `field`.
    ///
    /// # Errors
    /// Propagates aggregation errors
    pub fn distribution(&self, dataset: &Dataset, field: &str) -> Result<QueryOutcome<AggregateTable>> {
        if let Some(outcome) = Self::require_fields(dataset, [field]) {
            return Ok(outcome);
        }
        let table = AggregationEngine::value_counts(dataset, field)?;
        Ok(if table.is_empty() {
            QueryOutcome::NoDataMatched
        } else {
            QueryOutcome::Found(table)
        })
    }

    /// General group aggregate, e.g. amount per transaction type.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] for a non-numeric sum/mean field and
    /// [`Error::Computation`] when a mean has no values
    pub fn breakdown(&self, dataset: &Dataset, spec: &AggregationSpec) -> Result<QueryOutcome<AggregateTable>> {
        let fields = spec
            .group_by
            .iter()
            .map(String::as_str)
            .chain([spec.value_field.as_str()]);
        if let Some(outcome) = Self::require_fields(dataset, fields) {
            return Ok(outcome);
        }
        if dataset.is_empty() {
            return Ok(QueryOutcome::NoDataMatched);
        }
        let table = AggregationEngine::reduce(dataset, spec)?;
        Ok(if table.is_empty() {
            QueryOutcome::NoDataMatched
        } else {
            QueryOutcome::Found(table)
        })
    }

    /// Summary statistics of every numeric field.
    ///
    /// # Errors
    /// Currently infallible; kept fallible for uniformity with other queries
    #[allow(clippy::unnecessary_wraps)]
    pub fn summarize(&self, dataset: &Dataset) -> Result<QueryOutcome<Vec<SummaryStats>>> {
        if dataset.is_empty() {
            return Ok(QueryOutcome::NoDataMatched);
        }
        Ok(QueryOutcome::Found(stats::describe(dataset)))
    }

    /// Pearson correlation matrix over `fields` (all numeric fields when empty).
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] for non-numeric fields
    pub fn correlations<S: AsRef<str>>(
        &self,
        dataset: &Dataset,
        fields: &[S],
    ) -> Result<QueryOutcome<CorrelationMatrix>> {
        if let Some(outcome) = Self::require_fields(dataset, fields.iter().map(AsRef::as_ref)) {
            return Ok(outcome);
        }
        if dataset.is_empty() {
            return Ok(QueryOutcome::NoDataMatched);
        }
        stats::correlation_matrix(dataset, fields).map(QueryOutcome::Found)
    }

    /// Fit `target ~ features` on `dataset` and predict at `feature_values`.
    ///
    /// # Errors
    /// See [`predict`](Self::predict)
    pub fn predict_target<S: AsRef<str>>(
        &self,
        dataset: &Dataset,
        features: &[S],
        target: &str,
        feature_values: &[f64],
    ) -> Result<QueryOutcome<Prediction>> {
        let request = PredictRequest::new(
            features.iter().map(AsRef::as_ref),
            target,
            feature_values.to_vec(),
        );
        self.predict(dataset, &request)
    }

    /// Run a prediction request, reusing a cached model when the snapshot
    /// is unchanged.
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] if the value count differs from the
    /// feature count, [`Error::SchemaMismatch`] for non-numeric fields, and
    /// [`Error::InsufficientData`] when the fit is degenerate
    pub fn predict(&self, dataset: &Dataset, request: &PredictRequest) -> Result<QueryOutcome<Prediction>> {
        let fields = request
            .features
            .iter()
            .map(String::as_str)
            .chain([request.target.as_str()]);
        if let Some(outcome) = Self::require_fields(dataset, fields) {
            return Ok(outcome);
        }
        if request.values.len() != request.features.len() {
            return Err(Error::DimensionMismatch {
                expected: request.features.len(),
                actual: request.values.len(),
            });
        }
        if dataset.is_empty() {
            return Ok(QueryOutcome::NoDataMatched);
        }

        let fit = self.fitted(dataset, &request.features, &request.target)?;
        let value = fit.model.predict(&request.values)?;
        Ok(QueryOutcome::Found(Prediction {
            model: fit.model,
            value,
            evaluation: request.include_evaluation.then_some(fit.evaluation),
        }))
    }

    fn fitted(&self, dataset: &Dataset, features: &[String], target: &str) -> Result<CachedFit> {
        let key = ModelKey::new(features, target);
        let snapshot = Snapshot::of(dataset);
        if let Some(hit) = self.models.get(&key).filter(|hit| hit.snapshot == snapshot) {
            debug!(target_field = target, fingerprint = snapshot.fingerprint, "model cache hit");
            return Ok(hit.value().clone());
        }

        let (model, evaluation) = self.predictor.fit_with_evaluation(dataset, features, target)?;
        let fit = CachedFit {
            snapshot,
            model: Arc::new(model),
            evaluation,
        };
        // Concurrent misses on one snapshot may both fit; the first insert
        // wins so callers share one model. A stale snapshot is replaced.
        let entry = self
            .models
            .entry(key)
            .and_modify(|cached| {
                if cached.snapshot != snapshot {
                    *cached = fit.clone();
                }
            })
            .or_insert_with(|| fit.clone());
        Ok(entry.value().clone())
    }

    /// Validate `raw`, append it to `store`, and invalidate cached models.
    ///
    /// # Errors
    /// Returns the validation or storage error; the cache is kept on failure
    pub fn ingest(&self, store: &dyn RecordStore, raw: RawRecord) -> Result<Record> {
        let record = store.append_raw(raw)?;
        let dropped = self.models.len();
        self.models.clear();
        info!(kind = store.schema().name(), dropped_models = dropped, "ingested record");
        Ok(record)
    }
}
