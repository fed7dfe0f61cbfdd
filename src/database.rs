use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};

use crate::record::{PatientRecord, COLUMN_NAMES};
use crate::source::{RowSource, SourceError};

/// Patient rows stored in a SQLite table whose columns follow [`COLUMN_NAMES`].
pub struct SqliteSource {
    path: PathBuf,
    table: String,
    connection: Connection,
}

impl SqliteSource {
    /// Opens an existing database; a missing file is an error, never created.
    pub fn open(path: &Path, table: &str) -> Result<Self, SourceError> {
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), table, "opened database");
        Ok(Self::from_connection(connection, path, table))
    }

    pub fn from_connection(connection: Connection, path: &Path, table: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            table: table.to_string(),
            connection,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks that the table has exactly the expected columns in order.
    pub fn verify_schema(&self) -> Result<(), SourceError> {
        let schema_error = |source| SourceError::Schema {
            table: self.table.clone(),
            source,
        };

        let sql = format!("PRAGMA table_info({})", quote_identifier(&self.table));
        let mut statement = self.connection.prepare(&sql).map_err(schema_error)?;
        let actual_columns = statement
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(schema_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(schema_error)?;

        if actual_columns.len() != COLUMN_NAMES.len() {
            return Err(SourceError::ColumnCount {
                table: self.table.clone(),
                expected: COLUMN_NAMES.len(),
                actual: actual_columns.len(),
            });
        }

        for (position, (expected, actual)) in COLUMN_NAMES.iter().zip(&actual_columns).enumerate() {
            if *expected != actual.as_str() {
                return Err(SourceError::ColumnMismatch {
                    table: self.table.clone(),
                    position: position + 1,
                    expected: (*expected).to_string(),
                    actual: actual.clone(),
                });
            }
        }

        Ok(())
    }

    fn select_row_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} LIMIT 1 OFFSET ?1",
            COLUMN_NAMES.join(", "),
            quote_identifier(&self.table)
        )
    }
}

impl RowSource for SqliteSource {
    fn fetch_row(&self, index: usize) -> Result<Option<PatientRecord>, SourceError> {
        let fetch_error = |source| SourceError::Fetch { index, source };
        let offset = i64::try_from(index).unwrap_or(i64::MAX);

        let mut statement = self
            .connection
            .prepare_cached(&self.select_row_sql())
            .map_err(fetch_error)?;

        statement
            .query_row([offset], read_record)
            .optional()
            .map_err(fetch_error)
    }
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<PatientRecord> {
    Ok(PatientRecord {
        age: row.get(0)?,
        sex: row.get(1)?,
        cp: row.get(2)?,
        trestbps: row.get(3)?,
        chol: row.get(4)?,
        fbs: row.get(5)?,
        restecg: row.get(6)?,
        thalach: row.get(7)?,
        exang: row.get(8)?,
        oldpeak: row.get(9)?,
        slope: row.get(10)?,
        ca: row.get(11)?,
        thal: row.get(12)?,
        target: row.get(13)?,
    })
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Creates the patient table and fills it with `records`.
pub fn write_records(
    connection: &Connection,
    table: &str,
    records: &[PatientRecord],
) -> rusqlite::Result<()> {
    let table = quote_identifier(table);
    connection.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            age INTEGER, sex INTEGER, cp INTEGER, trestbps INTEGER, chol INTEGER,
            fbs INTEGER, restecg INTEGER, thalach INTEGER, exang INTEGER, oldpeak REAL,
            slope INTEGER, ca INTEGER, thal INTEGER, target INTEGER
        );"
    ))?;

    let placeholders = vec!["?"; COLUMN_NAMES.len()].join(", ");
    let mut statement = connection.prepare(&format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        COLUMN_NAMES.join(", ")
    ))?;

    for record in records {
        statement.execute(rusqlite::params![
            record.age,
            record.sex,
            record.cp,
            record.trestbps,
            record.chol,
            record.fbs,
            record.restecg,
            record.thalach,
            record.exang,
            record.oldpeak,
            record.slope,
            record.ca,
            record.thal,
            record.target,
        ])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record;
    use crate::source::load_dataset;
    use tempfile::tempdir;

    fn sample_rows() -> Vec<PatientRecord> {
        let sick = [
            45.0, 1.0, 3.0, 120.0, 240.0, 0.0, 1.0, 150.0, 0.0, 2.0, 1.0, 0.0, 2.0,
        ];
        let healthy = [
            34.0, 0.0, 2.0, 130.0, 220.0, 1.0, 0.0, 140.0, 1.0, 1.5, 0.0, 1.0, 1.0,
        ];
        vec![record(sick, 1), record(healthy, 0)]
    }

    #[test]
    fn valid_database_verifies_and_fetches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("valid.sqlite");
        let connection = Connection::open(&path).unwrap();
        write_records(&connection, "tablica", &sample_rows()).unwrap();
        drop(connection);

        let source = SqliteSource::open(&path, "tablica").unwrap();
        source.verify_schema().unwrap();

        assert_eq!(source.fetch_row(1).unwrap(), Some(sample_rows()[1]));
        assert_eq!(source.fetch_row(2).unwrap(), None);
        assert_eq!(load_dataset(&source).unwrap(), sample_rows());
    }

    #[test]
    fn missing_database_is_not_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("non_existent.sqlite");

        let result = SqliteSource::open(&path, "tablica");

        assert!(matches!(result, Err(SourceError::Open { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn empty_database_fails_schema_and_fetch() {
        let connection = Connection::open_in_memory().unwrap();
        let source = SqliteSource::from_connection(connection, Path::new(":memory:"), "tablica");

        assert!(matches!(
            source.verify_schema(),
            Err(SourceError::ColumnCount { actual: 0, .. })
        ));
        assert!(matches!(
            source.fetch_row(0),
            Err(SourceError::Fetch { index: 0, .. })
        ));
    }

    #[test]
    fn renamed_column_is_reported_with_position() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute_batch(
                "CREATE TABLE tablica (
                    age INTEGER, sex INTEGER, chest_pain INTEGER, trestbps INTEGER, chol INTEGER,
                    fbs INTEGER, restecg INTEGER, thalach INTEGER, exang INTEGER, oldpeak REAL,
                    slope INTEGER, ca INTEGER, thal INTEGER, target INTEGER
                );",
            )
            .unwrap();
        let source = SqliteSource::from_connection(connection, Path::new(":memory:"), "tablica");

        match source.verify_schema() {
            Err(SourceError::ColumnMismatch {
                position,
                expected,
                actual,
                ..
            }) => {
                assert_eq!(position, 3);
                assert_eq!(expected, "cp");
                assert_eq!(actual, "chest_pain");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
