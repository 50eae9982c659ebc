//! Pipeline settings
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```rust
//! use ledger_insight::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_json(r#"{ "regression": { "seed": 7 } }"#).unwrap();
//! assert_eq!(config.regression.seed, 7);
//! assert_eq!(config.regression.min_samples, 5);
//! assert!(config.store_path("banking").ends_with("banking_data.csv"));
//! ```

use crate::regression::RegressionConfig;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory used when none is configured
pub const DEFAULT_DATA_DIR: &str = "data";

/// Settings shared by the stores and the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding one record file per kind
    pub data_dir: PathBuf,
    /// Regression fitting settings
    pub regression: RegressionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            regression: RegressionConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse settings from JSON, filling gaps with defaults.
    ///
    /// # Errors
    /// Returns [`crate::Error::Json`] for malformed JSON and
    /// [`crate::Error::InvalidInput`] for unusable values
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the data directory
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the regression settings
    #[must_use]
    pub const fn with_regression(mut self, regression: RegressionConfig) -> Self {
        self.regression = regression;
        self
    }

    /// Check every setting.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidInput`] naming the bad setting
    pub fn validate(&self) -> Result<()> {
        self.regression.validate()
    }

    /// Durable file for a record kind: `<data_dir>/<kind>_data.csv`
    #[must_use]
    pub fn store_path(&self, kind: &str) -> PathBuf {
        self.data_dir.join(format!("{kind}_data.csv"))
    }
}
