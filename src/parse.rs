use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::record::{PatientRecord, COLUMN_NAMES};
use crate::source::{RowSource, SourceError};

/// Patient rows read from a headered CSV file.
///
/// The header must list [`COLUMN_NAMES`] in order; the whole file is parsed
/// up front and rows are then served from memory.
#[derive(Debug, Clone)]
pub struct CsvSource {
    rows: Vec<PatientRecord>,
}

impl CsvSource {
    pub fn open(file_path: &Path) -> Result<Self, SourceError> {
        let csv_error = |source| SourceError::Csv {
            path: file_path.to_path_buf(),
            source,
        };

        let file = File::open(file_path).map_err(|error| csv_error(csv::Error::from(error)))?;
        let rows = match parse(BufReader::new(file), &file_path.display().to_string()) {
            Ok(rows) => rows,
            Err(ParseError::Csv(source)) => return Err(csv_error(source)),
            Err(ParseError::Header(mismatch)) => return Err(mismatch),
        };

        tracing::info!(path = %file_path.display(), rows = rows.len(), "loaded CSV dataset");
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RowSource for CsvSource {
    fn fetch_row(&self, index: usize) -> Result<Option<PatientRecord>, SourceError> {
        Ok(self.rows.get(index).copied())
    }
}

enum ParseError {
    Csv(csv::Error),
    Header(SourceError),
}

fn parse<R: Read>(reader: R, name: &str) -> Result<Vec<PatientRecord>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().map_err(ParseError::Csv)?.clone();
    if headers.len() != COLUMN_NAMES.len() {
        return Err(ParseError::Header(SourceError::ColumnCount {
            table: name.to_string(),
            expected: COLUMN_NAMES.len(),
            actual: headers.len(),
        }));
    }
    for (position, (expected, actual)) in COLUMN_NAMES.iter().zip(headers.iter()).enumerate() {
        if *expected != actual {
            return Err(ParseError::Header(SourceError::ColumnMismatch {
                table: name.to_string(),
                position: position + 1,
                expected: (*expected).to_string(),
                actual: actual.to_string(),
            }));
        }
    }

    reader
        .deserialize::<PatientRecord>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(ParseError::Csv)
}
