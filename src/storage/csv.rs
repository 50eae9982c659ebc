//! Flat CSV file backend
//!
//! One file per record kind: a header row naming the schema fields in order,
//! one row per record, empty cells for absent optional values. Schema
//! evolution is not supported; a header that differs from the schema is a
//! storage error.

use super::{ensure_identifier_policy, ensure_schema, RecordStore};
use crate::dataset::Dataset;
use crate::schema::{Record, Schema, TIME_FORMAT};
use crate::{Error, Result};
use arrow::compute;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use dashmap::DashMap;
use std::fs;
use std::io::{Cursor, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Process-wide exclusive guards, one per store path
fn write_guard(path: &Path) -> Arc<Mutex<()>> {
    static GUARDS: OnceLock<DashMap<PathBuf, Arc<Mutex<()>>>> = OnceLock::new();
    GUARDS
        .get_or_init(DashMap::new)
        .entry(path.to_path_buf())
        .or_default()
        .clone()
}

/// Absolute form of `path` without requiring it to exist
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
}

/// Encode a dataset as CSV with a header row.
///
/// # Errors
/// Returns error if Arrow fails to format a column
pub fn encode_csv(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_time_format(TIME_FORMAT.to_string())
            .build(&mut buf);
        writer.write(dataset.batch())?;
    }
    Ok(buf)
}

/// Decode CSV bytes written by [`encode_csv`] into a checked dataset.
///
/// Zero-length input decodes to an empty dataset.
///
/// # Errors
/// Returns [`Error::Storage`] if the header differs from the schema or a cell
/// cannot be parsed, and [`Error::Validation`] if a cell violates its field
/// constraints
pub fn decode_csv(schema: &Arc<Schema>, bytes: Vec<u8>) -> Result<Dataset> {
    if bytes.is_empty() {
        return Ok(Dataset::empty(Arc::clone(schema)));
    }
    check_header(schema, &bytes)?;

    let arrow_schema = Arc::new(schema.arrow_schema());
    let reader = ReaderBuilder::new(Arc::clone(&arrow_schema))
        .with_header(true)
        .build(Cursor::new(bytes))
        .map_err(|e| Error::Storage(format!("failed to open CSV reader: {e}")))?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch.map_err(|e| Error::Storage(format!("failed to parse CSV row: {e}")))?);
    }

    let batch = compute::concat_batches(&arrow_schema, &batches)?;
    Dataset::from_batch(Arc::clone(schema), batch)
}

fn check_header(schema: &Schema, bytes: &[u8]) -> Result<()> {
    let line_end = bytes.iter().position(|&b| b == b'\n').unwrap_or(bytes.len());
    let line = std::str::from_utf8(&bytes[..line_end])
        .map_err(|_| Error::Storage("header row is not valid UTF-8".to_string()))?;
    let found: Vec<&str> = line
        .trim_end_matches('\r')
        .split(',')
        .map(|name| name.trim().trim_matches('"'))
        .collect();
    let expected: Vec<&str> = schema.field_names().collect();

    if found == expected {
        Ok(())
    } else {
        Err(Error::Storage(format!(
            "header [{}] does not match schema '{}' [{}]",
            found.join(", "),
            schema.name(),
            expected.join(", ")
        )))
    }
}

/// Record store backed by one CSV file.
#[derive(Debug)]
pub struct CsvRecordStore {
    path: PathBuf,
    schema: Arc<Schema>,
    guard: Arc<Mutex<()>>,
}

impl CsvRecordStore {
    /// Open a store at `path`. The file is created on the first append.
    #[must_use]
    pub fn open(path: impl AsRef<Path>, schema: Arc<Schema>) -> Self {
        let path = absolute(path.as_ref());
        let guard = write_guard(&path);
        Self {
            path,
            schema,
            guard,
        }
    }

    /// Location of the durable file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn persist(&self, dataset: &Dataset) -> Result<()> {
        let bytes = encode_csv(dataset)?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let storage_err =
            |what: &str, e: std::io::Error| Error::Storage(format!("{what} {}: {e}", self.path.display()));

        fs::create_dir_all(dir).map_err(|e| storage_err("failed to create directory for", e))?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| storage_err("failed to stage", e))?;
        tmp.write_all(&bytes)
            .map_err(|e| storage_err("failed to write", e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| storage_err("failed to sync", e))?;
        tmp.persist(&self.path)
            .map_err(|e| storage_err("failed to replace", e.error))?;
        Ok(())
    }
}

impl RecordStore for CsvRecordStore {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn try_load(&self) -> Result<Dataset> {
        let Some(bytes) = self.read_bytes()? else {
            debug!(path = %self.path.display(), "no record file yet");
            return Ok(Dataset::empty(Arc::clone(&self.schema)));
        };
        let dataset = decode_csv(&self.schema, bytes)?;
        info!(
            kind = self.schema.name(),
            rows = dataset.len(),
            path = %self.path.display(),
            "loaded records"
        );
        Ok(dataset)
    }

    fn append(&self, record: Record) -> Result<()> {
        ensure_schema(&self.schema, &record)?;

        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        // Strict read: a corrupt file must never be overwritten by a
        // collection that silently lost its rows.
        let current = self.try_load()?;
        ensure_identifier_policy(&current, &record)?;
        let updated = current.with_appended(&record)?;
        self.persist(&updated)?;

        info!(
            kind = self.schema.name(),
            rows = updated.len(),
            path = %self.path.display(),
            "appended record"
        );
        Ok(())
    }
}
