//! # ledger-insight: Embedded Analytics Pipeline for Business Dashboards
//!
//! **Version**: 0.1.0
//!
//! ledger-insight keeps a growing collection of business records (banking
//! transactions, insurance policies, delivery orders) in a flat durable file
//! and answers dashboard queries over it: filter, group-and-reduce,
//! descriptive statistics and on-demand linear regression.
//!
//! ## Design Principles
//!
//! - **Poka-Yoke**: records are validated against their schema before they
//!   can reach the store
//! - **Jidoka**: absent fields and empty selections surface as explicit
//!   [`orchestrator::QueryOutcome`]s, never as silent empty results
//! - **Muda elimination**: fitted models are cached per dataset snapshot
//!
//! ## Pipeline
//!
//! ```text
//! RecordStore ──load──▶ Dataset ──FilterEngine──▶ Dataset ──▶ AggregationEngine
//!      ▲                                              │        RegressionPredictor
//!      └────────── append (validated Record) ◀────────┘        stats
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use ledger_insight::config::PipelineConfig;
//! use ledger_insight::orchestrator::QueryOrchestrator;
//! use ledger_insight::schema::{catalog, RawRecord};
//! use ledger_insight::storage::{CsvRecordStore, RecordStore};
//!
//! # fn main() -> ledger_insight::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let config = PipelineConfig::default().with_data_dir(dir.path());
//! let store = CsvRecordStore::open(config.store_path("insurance"), catalog::insurance());
//! let orchestrator = QueryOrchestrator::from_config(&config)?;
//!
//! orchestrator.ingest(
//!     &store,
//!     RawRecord::new()
//!         .set("Name", "Asha")
//!         .set("Age", "42")
//!         .set("Health_Risk_Score", "3.5")
//!         .set("Premium_Amount", "1200")
//!         .set("Claim_Amount", "0"),
//! )?;
//!
//! let dataset = store.load();
//! let hits = orchestrator.lookup_by_identifier(&dataset, "asha")?;
//! assert!(hits.is_found());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod orchestrator;
pub mod regression;
pub mod schema;
pub mod stats;
pub mod storage;
pub mod telemetry;

pub use error::{Error, Result};
