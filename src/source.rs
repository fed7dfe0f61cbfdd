//! Row sources feeding the learning engine.
//!
//! A source hands out [`PatientRecord`]s by sequential index and answers
//! `Ok(None)` once the index runs past the end of its data. Training never
//! talks to a source directly: [`load_dataset`] drains it into memory first.

use std::path::PathBuf;

use thiserror::Error;

use crate::record::PatientRecord;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to open the database: {path}. Error: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("Failed to fetch row {index}: {source}")]
    Fetch {
        index: usize,
        source: rusqlite::Error,
    },
    #[error("Failed to read schema of table '{table}': {source}")]
    Schema {
        table: String,
        source: rusqlite::Error,
    },
    #[error("Incorrect number of columns in '{table}'. Expected: {expected}, but got: {actual}")]
    ColumnCount {
        table: String,
        expected: usize,
        actual: usize,
    },
    #[error("Column {position} of '{table}' should be '{expected}' but is '{actual}'")]
    ColumnMismatch {
        table: String,
        position: usize,
        expected: String,
        actual: String,
    },
    #[error("Failed to read CSV file {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Anything that can hand out records by position.
///
/// Fetching the same index twice within one run must return the same record.
pub trait RowSource {
    fn fetch_row(&self, index: usize) -> Result<Option<PatientRecord>, SourceError>;
}

/// Rows already held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Vec<PatientRecord>,
}

impl MemorySource {
    pub fn new(rows: Vec<PatientRecord>) -> Self {
        Self { rows }
    }
}

impl RowSource for MemorySource {
    fn fetch_row(&self, index: usize) -> Result<Option<PatientRecord>, SourceError> {
        Ok(self.rows.get(index).copied())
    }
}

impl From<Vec<PatientRecord>> for MemorySource {
    fn from(rows: Vec<PatientRecord>) -> Self {
        Self::new(rows)
    }
}

/// Fetches rows from index 0 upward until the source reports no more rows.
pub fn load_dataset(source: &dyn RowSource) -> Result<Vec<PatientRecord>, SourceError> {
    let mut records = Vec::new();

    while let Some(record) = source.fetch_row(records.len())? {
        records.push(record);
    }

    tracing::debug!(rows = records.len(), "dataset loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{record, FEATURE_COUNT};
    use std::cell::RefCell;

    struct CountingSource {
        rows: Vec<PatientRecord>,
        requested: RefCell<Vec<usize>>,
    }

    impl RowSource for CountingSource {
        fn fetch_row(&self, index: usize) -> Result<Option<PatientRecord>, SourceError> {
            self.requested.borrow_mut().push(index);
            Ok(self.rows.get(index).copied())
        }
    }

    #[test]
    fn load_drains_in_index_order() {
        let rows: Vec<_> = (0..4)
            .map(|age| {
                let mut values = [0.0; FEATURE_COUNT];
                values[0] = f64::from(age);
                record(values, age % 2)
            })
            .collect();
        let source = CountingSource {
            rows: rows.clone(),
            requested: RefCell::new(Vec::new()),
        };

        let loaded = load_dataset(&source).unwrap();

        assert_eq!(loaded, rows);
        assert_eq!(*source.requested.borrow(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn memory_source_is_idempotent_and_ends() {
        let sample = record([1.0; FEATURE_COUNT], 1);
        let source = MemorySource::new(vec![sample]);

        assert_eq!(source.fetch_row(0).unwrap(), Some(sample));
        assert_eq!(source.fetch_row(0).unwrap(), Some(sample));
        assert_eq!(source.fetch_row(1).unwrap(), None);
        assert!(load_dataset(&MemorySource::default()).unwrap().is_empty());
    }
}
